use crate::model::lenient::null_as_default;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Payload of `/api/v1/analytics/dashboard-summary`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DashboardSummary {
    #[serde(default)]
    pub overview: Overview,
    #[serde(default)]
    pub transport_analysis: TransportAnalysis,
    #[serde(default)]
    pub food_analysis: FoodAnalysis,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Overview {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_trips: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_food_entries: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_transport_spending: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_food_spending: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_combined_spending: f64,
}

impl Overview {
    pub fn total_entries(&self) -> u64 {
        self.total_trips + self.total_food_entries
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TransportAnalysis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub mode_distribution: BTreeMap<String, u64>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_trip_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FoodAnalysis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_meal_cost: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_restaurants_visited: u64,
}

/// Payload of `/analytics/dashboard/overview`.
///
/// Covers both the research and the extended dashboards; fields a backend
/// does not send stay at zero.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResearchOverview {
    #[serde(default, deserialize_with = "null_as_default")]
    pub period_days: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_users: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_users: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_trips: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_food_entries: u64,
    #[serde(default)]
    pub data_quality: DataQuality,
    #[serde(default)]
    pub user_engagement: UserEngagement,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_distance_km: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_emissions_saved_kg: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_users_last_7_days: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_trip_duration_minutes: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub popular_transport_mode: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataQuality {
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_quality_score: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub high_quality_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UserEngagement {
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_user_percentage: f64,
}

/// Payload of `/analytics/trips/mode-split`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModeSplitReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub period_days: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_trip_segments: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub mode_split: Vec<ModeSplitEntry>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModeSplitEntry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub mode: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub percentage: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_distance_km: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_cost: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_duration_minutes: f64,
}

/// Bucket size for `/analytics/trips/temporal-patterns`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Hour,
    Day,
    Week,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Hour => "hour",
            Granularity::Day => "day",
            Granularity::Week => "week",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of `/analytics/trips/temporal-patterns`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemporalReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub period_days: u32,
    #[serde(default)]
    pub granularity: Granularity,
    #[serde(default, deserialize_with = "null_as_default")]
    pub temporal_patterns: Vec<TemporalPattern>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TemporalPattern {
    /// Bucket key; `{"hour": 8}` style objects on the wire, flattened to the number.
    #[serde(default, deserialize_with = "bucket_key", serialize_with = "bucket_key_out")]
    pub time_period: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub trip_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub unique_users: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_cost: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub most_common_mode: String,
}

fn bucket_key<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    let number = match &value {
        serde_json::Value::Number(n) => n.as_u64(),
        serde_json::Value::Object(map) => map.values().find_map(|v| v.as_u64()),
        _ => None,
    };
    Ok(number.unwrap_or(0) as u32)
}

fn bucket_key_out<S>(key: &u32, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u32(*key)
}
