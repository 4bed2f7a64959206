use chrono::{DateTime, Duration, Timelike, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tripcore::model::{FoodRecord, PlaceRef, Position, TrackedEntity, TransportMode, TripRecord};

/// Places the synthetic survey draws from.
pub const PLACES: [(&str, f64, f64); 10] = [
    ("Thiruvananthapuram", 8.5241, 76.9366),
    ("Technopark", 8.5581, 76.8816),
    ("Kovalam", 8.4004, 76.9784),
    ("Kollam", 8.8932, 76.6141),
    ("Alappuzha", 9.4981, 76.3388),
    ("Kottayam", 9.5916, 76.5222),
    ("Kochi", 9.9312, 76.2673),
    ("Ernakulam", 9.9816, 76.2999),
    ("Thrissur", 10.5276, 76.2144),
    ("Kozhikode", 11.2588, 75.7804),
];

const MODES: [(TransportMode, u32); 9] = [
    (TransportMode::Bus, 30),
    (TransportMode::AutoRickshaw, 18),
    (TransportMode::Motorcycle, 14),
    (TransportMode::Car, 12),
    (TransportMode::Walk, 10),
    (TransportMode::Bicycle, 5),
    (TransportMode::Train, 5),
    (TransportMode::Metro, 4),
    (TransportMode::Ferry, 2),
];

const PURPOSES: [&str; 6] = ["work", "education", "shopping", "leisure", "healthcare", "personal"];
pub const USER_TYPES: [&str; 4] = ["resident", "student", "professional", "tourist"];
const RESTAURANTS: [(&str, &str); 8] = [
    ("Kerala House", "kerala"),
    ("Spice Garden", "south_indian"),
    ("Paragon", "kerala"),
    ("Zam Zam", "arabic"),
    ("Saravana Bhavan", "south_indian"),
    ("Dhe Puttu", "kerala"),
    ("Kashi Cafe", "continental"),
    ("Rahmath", "malabar"),
];
const MEALS: [(&str, u32); 4] = [("breakfast", 8), ("lunch", 13), ("snack", 16), ("dinner", 20)];
/// Trip start hours, weighted towards the commute peaks.
const HOURS: [(u32, u32); 12] = [
    (6, 3),
    (7, 6),
    (8, 10),
    (9, 9),
    (10, 5),
    (12, 4),
    (13, 4),
    (15, 3),
    (17, 8),
    (18, 10),
    (19, 6),
    (21, 2),
];

/// Parameters of the synthetic survey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    pub seed: u64,
    pub users: usize,
    pub trips: usize,
    pub food_entries: usize,
    pub active_trips: usize,
    /// Records are spread over this many days before "now".
    pub history_days: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            seed: 7,
            users: 40,
            trips: 400,
            food_entries: 150,
            active_trips: 12,
            history_days: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyUser {
    pub id: String,
    pub user_type: String,
}

#[derive(Debug, Clone, Default)]
pub struct SurveyDataset {
    pub users: Vec<SurveyUser>,
    pub trips: Vec<TripRecord>,
    pub food: Vec<FoodRecord>,
    pub active: Vec<TrackedEntity>,
}

pub fn pick_weighted<T: Copy>(rng: &mut StdRng, table: &[(T, u32)]) -> T {
    let total: u32 = table.iter().map(|(_, w)| *w).sum();
    let mut roll = rng.gen_range(0..total.max(1));
    for (item, weight) in table {
        if roll < *weight {
            return *item;
        }
        roll -= weight;
    }
    table[table.len() - 1].0
}

pub fn random_place(rng: &mut StdRng) -> (&'static str, f64, f64) {
    PLACES[rng.gen_range(0..PLACES.len())]
}

pub fn random_mode(rng: &mut StdRng) -> TransportMode {
    pick_weighted(rng, &MODES)
}

pub fn random_purpose(rng: &mut StdRng) -> &'static str {
    PURPOSES.choose(rng).copied().unwrap_or("personal")
}

/// Per-kilometre fare and speed used for synthetic trips.
pub fn mode_profile(mode: TransportMode) -> (f64, f64) {
    match mode {
        TransportMode::Walk => (0.0, 5.0),
        TransportMode::Bicycle => (0.0, 14.0),
        TransportMode::Bus => (1.1, 22.0),
        TransportMode::Train => (0.6, 45.0),
        TransportMode::Metro => (2.5, 35.0),
        TransportMode::Ferry => (4.0, 12.0),
        TransportMode::AutoRickshaw => (15.0, 20.0),
        TransportMode::Motorcycle => (2.5, 30.0),
        TransportMode::Car | TransportMode::Taxi | TransportMode::RideShare => (8.0, 28.0),
        TransportMode::Unknown => (3.0, 20.0),
    }
}

fn place_ref((city, lat, lng): (&str, f64, f64)) -> PlaceRef {
    PlaceRef {
        city: city.to_string(),
        latitude: lat,
        longitude: lng,
    }
}

fn timestamp_in_history(rng: &mut StdRng, now: DateTime<Utc>, days: u32, hour: u32) -> DateTime<Utc> {
    let day = now - Duration::days(rng.gen_range(0..days.max(1)) as i64);
    let minute = rng.gen_range(0..60);
    day.date_naive()
        .and_hms_opt(hour, minute, 0)
        .map(|naive| naive.and_utc())
        .filter(|t| *t <= now)
        .unwrap_or(now - Duration::minutes(minute as i64))
}

fn build_trip(rng: &mut StdRng, index: usize, user: &SurveyUser, config: &GeneratorConfig, now: DateTime<Utc>) -> TripRecord {
    let mode = random_mode(rng);
    let (fare, speed) = mode_profile(mode);
    let distance_km = match mode {
        TransportMode::Walk => rng.gen_range(0.3..3.0),
        TransportMode::Bicycle => rng.gen_range(1.0..8.0),
        TransportMode::Train => rng.gen_range(15.0..120.0),
        _ => rng.gen_range(2.0..25.0),
    };
    let start = random_place(rng);
    let end = random_place(rng);
    let hour = pick_weighted(rng, &HOURS);

    TripRecord {
        id: format!("trip-{index:05}"),
        transport_mode: mode,
        purpose: random_purpose(rng).to_string(),
        start_location: place_ref(start),
        end_location: place_ref(end),
        cost: (distance_km * fare).round(),
        distance_km: (distance_km * 10.0).round() / 10.0,
        duration_minutes: (distance_km / speed * 60.0).round().max(1.0),
        number_of_people: rng.gen_range(1..=4),
        user_id: user.id.clone(),
        created_at: Some(timestamp_in_history(rng, now, config.history_days, hour)),
    }
}

fn build_food(rng: &mut StdRng, index: usize, config: &GeneratorConfig, now: DateTime<Utc>) -> FoodRecord {
    let (restaurant, cuisine) = RESTAURANTS[rng.gen_range(0..RESTAURANTS.len())];
    let (meal, hour) = MEALS[rng.gen_range(0..MEALS.len())];
    let people = rng.gen_range(1..=5);
    FoodRecord {
        id: format!("food-{index:05}"),
        restaurant_name: restaurant.to_string(),
        cuisine_type: cuisine.to_string(),
        meal_type: meal.to_string(),
        total_cost: (rng.gen_range(60.0..220.0_f64) * people as f64).round(),
        number_of_people: people,
        notes: None,
        location: place_ref(random_place(rng)),
        created_at: Some(timestamp_in_history(rng, now, config.history_days, hour)),
    }
}

/// Starts a fresh trip near one of the known places.
pub fn spawn_active_trip(rng: &mut StdRng, trip_id: String, user_type: &str, now: DateTime<Utc>) -> TrackedEntity {
    let (name, lat, lng) = random_place(rng);
    let mut entity = TrackedEntity::new(
        trip_id,
        Position::named(
            lat + rng.gen_range(-0.01..0.01),
            lng + rng.gen_range(-0.01..0.01),
            name,
        ),
        random_mode(rng),
    );
    entity.user_type = user_type.to_string();
    entity.trip_purpose = random_purpose(rng).to_string();
    entity.group_size = rng.gen_range(1..=4);
    entity.started_at = Some(
        (now - Duration::minutes(rng.gen_range(0..90)))
            .with_nanosecond(0)
            .unwrap_or(now),
    );
    entity
}

/// Builds the whole synthetic survey; the same seed and `now` give the same data.
pub fn build_dataset(config: &GeneratorConfig, now: DateTime<Utc>) -> SurveyDataset {
    let mut rng = StdRng::seed_from_u64(config.seed);

    let users: Vec<SurveyUser> = (0..config.users.max(1))
        .map(|i| SurveyUser {
            id: format!("user-{i:04}"),
            user_type: USER_TYPES[rng.gen_range(0..USER_TYPES.len())].to_string(),
        })
        .collect();

    let trips = (0..config.trips)
        .map(|i| {
            let user = &users[rng.gen_range(0..users.len())];
            build_trip(&mut rng, i, user, config, now)
        })
        .collect();

    let food = (0..config.food_entries)
        .map(|i| build_food(&mut rng, i, config, now))
        .collect();

    let active = (0..config.active_trips)
        .map(|i| {
            let user_type = users[rng.gen_range(0..users.len())].user_type.clone();
            spawn_active_trip(&mut rng, format!("live-{i:04}"), &user_type, now)
        })
        .collect();

    SurveyDataset {
        users,
        trips,
        food,
        active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-12-26T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn dataset_has_requested_sizes() {
        let config = GeneratorConfig {
            trips: 25,
            food_entries: 9,
            active_trips: 4,
            ..Default::default()
        };
        let data = build_dataset(&config, now());
        assert_eq!(data.trips.len(), 25);
        assert_eq!(data.food.len(), 9);
        assert_eq!(data.active.len(), 4);
        assert!(data.trips.iter().all(|t| t.created_at.unwrap() <= now()));
    }

    #[test]
    fn same_seed_same_survey() {
        let config = GeneratorConfig::default();
        let a = build_dataset(&config, now());
        let b = build_dataset(&config, now());
        assert_eq!(a.trips, b.trips);
        assert_eq!(a.active, b.active);

        let other = build_dataset(&GeneratorConfig { seed: 99, ..config }, now());
        assert_ne!(a.trips, other.trips);
    }

    #[test]
    fn active_trips_stay_in_kerala() {
        let data = build_dataset(&GeneratorConfig::default(), now());
        for trip in &data.active {
            assert!((8.0..12.0).contains(&trip.location.lat));
            assert!((75.0..78.0).contains(&trip.location.lng));
            assert!(trip.location.name.is_some());
            assert_ne!(trip.user_type, "unknown");
        }
    }
}
