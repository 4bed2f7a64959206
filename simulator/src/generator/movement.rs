use crate::generator::profile::{mode_profile, spawn_active_trip, USER_TYPES};
use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tripcore::channel::ServerMessage;
use tripcore::model::{Position, TrackedEntity, TripSummary};

const CUISINES: [&str; 4] = ["kerala", "south_indian", "malabar", "continental"];
const MEALS: [&str; 4] = ["breakfast", "lunch", "snack", "dinner"];

/// Per-tick behaviour of the live trips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Largest per-tick step in degrees.
    pub step_deg: f64,
    pub completion_probability: f64,
    pub start_probability: f64,
    pub food_probability: f64,
    pub max_active: usize,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            step_deg: 0.002,
            completion_probability: 0.03,
            start_probability: 0.15,
            food_probability: 0.05,
            max_active: 25,
        }
    }
}

/// Random walk over the active trips.
pub struct MovementModel {
    config: MovementConfig,
    rng: StdRng,
    next_id: u64,
}

impl MovementModel {
    pub fn new(config: MovementConfig, seed: u64) -> Self {
        Self {
            config,
            rng: StdRng::seed_from_u64(seed.wrapping_add(1)),
            next_id: 0,
        }
    }

    /// Advances every trip by one tick and returns the frames to broadcast,
    /// in the order they happened.
    pub fn step(&mut self, active: &mut Vec<TrackedEntity>, now: DateTime<Utc>) -> Vec<ServerMessage> {
        let mut messages = Vec::with_capacity(active.len() + 2);
        let mut finished = Vec::new();

        for (idx, trip) in active.iter_mut().enumerate() {
            if self.rng.gen_bool(self.config.completion_probability.clamp(0.0, 1.0)) {
                finished.push(idx);
                continue;
            }
            let step = self.config.step_deg;
            trip.location = Position {
                lat: trip.location.lat + self.rng.gen_range(-step..=step),
                lng: trip.location.lng + self.rng.gen_range(-step..=step),
                name: trip.location.name.clone(),
            };
            messages.push(ServerMessage::LiveLocation {
                user_id: trip.trip_id.clone(),
                location: trip.location.clone(),
            });
        }

        for idx in finished.into_iter().rev() {
            let trip = active.remove(idx);
            messages.push(ServerMessage::TripCompleted {
                user_id: trip.trip_id.clone(),
                trip_summary: Some(summarize(&trip, now)),
            });
        }

        if active.len() < self.config.max_active
            && self.rng.gen_bool(self.config.start_probability.clamp(0.0, 1.0))
        {
            let user_type = USER_TYPES[self.rng.gen_range(0..USER_TYPES.len())];
            let trip_id = format!("live-s{:05}", self.next_id);
            self.next_id += 1;
            let mut trip = spawn_active_trip(&mut self.rng, trip_id, user_type, now);
            trip.started_at = Some(now);
            active.push(trip.clone());
            messages.push(ServerMessage::TripStarted { trip });
        }

        if self.rng.gen_bool(self.config.food_probability.clamp(0.0, 1.0)) {
            let people = self.rng.gen_range(1..=4);
            messages.push(ServerMessage::FoodEntry {
                user_id: format!("user-{:04}", self.rng.gen_range(0..100)),
                food_summary: json!({
                    "cuisine_type": CUISINES[self.rng.gen_range(0..CUISINES.len())],
                    "meal_type": MEALS[self.rng.gen_range(0..MEALS.len())],
                    "total_cost": (self.rng.gen_range(80.0..200.0_f64) * people as f64).round(),
                }),
            });
        }

        messages
    }
}

fn summarize(trip: &TrackedEntity, now: DateTime<Utc>) -> TripSummary {
    let minutes = trip
        .started_at
        .map(|start| (now - start).num_minutes().max(1))
        .unwrap_or(15) as u32;
    let (fare, speed) = mode_profile(trip.transport_mode);
    let distance = (speed * minutes as f64 / 60.0 * 10.0).round() / 10.0;
    TripSummary {
        purpose: Some(trip.trip_purpose.clone()),
        total_cost: (distance * fare).round(),
        total_distance: distance,
        modes_used: vec![trip.transport_mode],
        duration_minutes: minutes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tripcore::model::TransportMode;

    fn trips() -> Vec<TrackedEntity> {
        vec![
            TrackedEntity::new("a", Position::named(8.52, 76.93, "Thampanoor"), TransportMode::Bus),
            TrackedEntity::new("b", Position::new(9.93, 76.26), TransportMode::Walk),
        ]
    }

    fn quiet() -> MovementConfig {
        MovementConfig {
            completion_probability: 0.0,
            start_probability: 0.0,
            food_probability: 0.0,
            ..Default::default()
        }
    }

    #[test]
    fn every_trip_reports_its_new_location() {
        let mut active = trips();
        let mut model = MovementModel::new(quiet(), 1);
        let messages = model.step(&mut active, Utc::now());
        assert_eq!(messages.len(), 2);
        for (message, trip) in messages.iter().zip(&active) {
            match message {
                ServerMessage::LiveLocation { user_id, location } => {
                    assert_eq!(user_id, &trip.trip_id);
                    assert_eq!(location, &trip.location);
                }
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!((active[0].location.lat - 8.52).abs() <= 0.002 + 1e-9);
        assert_eq!(active[0].location.name.as_deref(), Some("Thampanoor"));
    }

    #[test]
    fn completed_trips_leave_the_active_set() {
        let mut active = trips();
        let mut model = MovementModel::new(
            MovementConfig {
                completion_probability: 1.0,
                ..quiet()
            },
            1,
        );
        let messages = model.step(&mut active, Utc::now());
        assert!(active.is_empty());
        let completed: Vec<&str> = messages
            .iter()
            .filter_map(|m| match m {
                ServerMessage::TripCompleted { user_id, .. } => Some(user_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec!["b", "a"]);
    }

    #[test]
    fn new_trips_respect_the_cap() {
        let config = MovementConfig {
            start_probability: 1.0,
            max_active: 3,
            ..quiet()
        };
        let mut active = trips();
        let mut model = MovementModel::new(config, 5);
        let first = model.step(&mut active, Utc::now());
        assert!(matches!(first.last(), Some(ServerMessage::TripStarted { .. })));
        assert_eq!(active.len(), 3);

        model.step(&mut active, Utc::now());
        assert_eq!(active.len(), 3);
    }
}
