use crate::model::lenient::{null_as_default, timestamp};
use crate::model::trip::TransportMode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// City-level location attached to survey records.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PlaceRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub city: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub latitude: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub longitude: f64,
}

/// Trip entry as returned by `/api/v1/trips`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TripRecord {
    #[serde(rename = "_id", default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default)]
    pub transport_mode: TransportMode,
    #[serde(default, deserialize_with = "null_as_default")]
    pub purpose: String,
    #[serde(default)]
    pub start_location: PlaceRef,
    #[serde(default)]
    pub end_location: PlaceRef,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cost: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub distance_km: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub duration_minutes: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub number_of_people: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub user_id: String,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Food entry as returned by `/api/v1/food`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FoodRecord {
    #[serde(rename = "_id", default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub restaurant_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cuisine_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub meal_type: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_cost: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub number_of_people: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub location: PlaceRef,
    #[serde(default, deserialize_with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trip_record_reads_mock_backend_shape() {
        let raw = r#"{
            "_id": "a1", "transport_mode": "auto", "purpose": "shopping",
            "start_location": {"city": "Thiruvananthapuram", "latitude": 8.5241, "longitude": 76.9366},
            "end_location": {"city": "Kovalam", "latitude": 8.4004, "longitude": 76.9784},
            "cost": 150.0, "number_of_people": 2, "created_at": "2024-12-26T14:30:00"
        }"#;
        let record: TripRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.transport_mode, TransportMode::AutoRickshaw);
        assert_eq!(record.end_location.city, "Kovalam");
        assert_eq!(record.distance_km, 0.0);
        assert!(record.created_at.is_some());
    }
}
