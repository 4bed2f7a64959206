use crate::model::lenient::{null_as_default, timestamp};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport mode reported for a trip segment.
///
/// Decoding is lenient: unrecognised strings become [`TransportMode::Unknown`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TransportMode {
    Walk,
    Bicycle,
    Motorcycle,
    Car,
    AutoRickshaw,
    Bus,
    Train,
    Metro,
    Ferry,
    Taxi,
    RideShare,
    #[default]
    Unknown,
}

impl TransportMode {
    pub const ALL: [TransportMode; 11] = [
        TransportMode::Walk,
        TransportMode::Bicycle,
        TransportMode::Motorcycle,
        TransportMode::Car,
        TransportMode::AutoRickshaw,
        TransportMode::Bus,
        TransportMode::Train,
        TransportMode::Metro,
        TransportMode::Ferry,
        TransportMode::Taxi,
        TransportMode::RideShare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TransportMode::Walk => "walk",
            TransportMode::Bicycle => "bicycle",
            TransportMode::Motorcycle => "motorcycle",
            TransportMode::Car => "car",
            TransportMode::AutoRickshaw => "auto_rickshaw",
            TransportMode::Bus => "bus",
            TransportMode::Train => "train",
            TransportMode::Metro => "metro",
            TransportMode::Ferry => "ferry",
            TransportMode::Taxi => "taxi",
            TransportMode::RideShare => "ride_share",
            TransportMode::Unknown => "unknown",
        }
    }

    /// Human label, e.g. `auto rickshaw`.
    pub fn label(&self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl From<&str> for TransportMode {
    fn from(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "walk" | "walking" => TransportMode::Walk,
            "bicycle" | "bike" | "cycle" => TransportMode::Bicycle,
            "motorcycle" | "two_wheeler" => TransportMode::Motorcycle,
            "car" => TransportMode::Car,
            "auto_rickshaw" | "auto" | "rickshaw" => TransportMode::AutoRickshaw,
            "bus" => TransportMode::Bus,
            "train" => TransportMode::Train,
            "metro" => TransportMode::Metro,
            "ferry" | "boat" => TransportMode::Ferry,
            "taxi" => TransportMode::Taxi,
            "ride_share" | "rideshare" => TransportMode::RideShare,
            _ => TransportMode::Unknown,
        }
    }
}

impl From<String> for TransportMode {
    fn from(raw: String) -> Self {
        TransportMode::from(raw.as_str())
    }
}

impl From<TransportMode> for String {
    fn from(mode: TransportMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for TransportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current position of a tracked trip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    #[serde(default, deserialize_with = "null_as_default")]
    pub lat: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Position {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat,
            lng,
            name: None,
        }
    }

    pub fn named(lat: f64, lng: f64, name: impl Into<String>) -> Self {
        Self {
            lat,
            lng,
            name: Some(name.into()),
        }
    }
}

/// An active trip shown on the live map, keyed by `trip_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedEntity {
    pub trip_id: String,
    #[serde(default = "unknown_label", deserialize_with = "null_as_unknown")]
    pub user_type: String,
    #[serde(default)]
    pub location: Position,
    #[serde(default)]
    pub transport_mode: TransportMode,
    #[serde(default = "unknown_label", deserialize_with = "null_as_unknown")]
    pub trip_purpose: String,
    #[serde(default = "single_member", deserialize_with = "null_as_single")]
    pub group_size: u32,
    #[serde(default, deserialize_with = "timestamp")]
    pub started_at: Option<DateTime<Utc>>,
}

impl TrackedEntity {
    pub fn new(trip_id: impl Into<String>, location: Position, mode: TransportMode) -> Self {
        Self {
            trip_id: trip_id.into(),
            user_type: unknown_label(),
            location,
            transport_mode: mode,
            trip_purpose: unknown_label(),
            group_size: 1,
            started_at: None,
        }
    }
}

/// Summary attached to a `trip_completed` push message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TripSummary {
    #[serde(default)]
    pub purpose: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_cost: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_distance: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub modes_used: Vec<TransportMode>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration_minutes: u32,
}

fn unknown_label() -> String {
    "unknown".to_string()
}

fn single_member() -> u32 {
    1
}

fn null_as_unknown<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(unknown_label))
}

fn null_as_single<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<u32>::deserialize(deserializer)?.unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parsing_accepts_aliases_and_unknowns() {
        assert_eq!(TransportMode::from("Auto"), TransportMode::AutoRickshaw);
        assert_eq!(TransportMode::from("bike"), TransportMode::Bicycle);
        assert_eq!(TransportMode::from("hovercraft"), TransportMode::Unknown);
        assert_eq!(TransportMode::AutoRickshaw.label(), "auto rickshaw");
    }

    #[test]
    fn live_trip_decodes_with_nulls_and_missing_fields() {
        let raw = r#"{
            "trip_id": "t-1",
            "user_type": null,
            "location": {"lat": 9.93, "lng": null, "name": "Kochi"},
            "transport_mode": "bus",
            "group_size": null,
            "started_at": "2024-12-26T09:00:00"
        }"#;
        let trip: TrackedEntity = serde_json::from_str(raw).unwrap();
        assert_eq!(trip.user_type, "unknown");
        assert_eq!(trip.trip_purpose, "unknown");
        assert_eq!(trip.location.lng, 0.0);
        assert_eq!(trip.location.name.as_deref(), Some("Kochi"));
        assert_eq!(trip.transport_mode, TransportMode::Bus);
        assert_eq!(trip.group_size, 1);
        assert!(trip.started_at.is_some());
    }

    #[test]
    fn mode_serializes_as_snake_case_string() {
        let json = serde_json::to_string(&TransportMode::RideShare).unwrap();
        assert_eq!(json, "\"ride_share\"");
    }
}
