use crate::generator::profile::SurveyDataset;
use chrono::{DateTime, Datelike, Duration, Timelike, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tripcore::model::{
    DashboardSummary, DataQuality, FoodAnalysis, FoodRecord, Granularity, ModeSplitEntry,
    ModeSplitReport, Overview, ResearchOverview, TemporalPattern, TemporalReport, TrackedEntity,
    TransportAnalysis, TransportMode, TripRecord, UserEngagement,
};
use tripcore::view::format::percentage;

/// kg CO₂ per passenger-km for a private car; savings are measured against it.
const CAR_KG_PER_KM: f64 = 0.171;
const HIGH_QUALITY: f64 = 0.75;

fn emission_factor(mode: TransportMode) -> f64 {
    match mode {
        TransportMode::Walk | TransportMode::Bicycle => 0.0,
        TransportMode::Bus => 0.089,
        TransportMode::Train | TransportMode::Metro => 0.041,
        TransportMode::Ferry => 0.12,
        TransportMode::AutoRickshaw | TransportMode::Motorcycle => 0.103,
        _ => CAR_KG_PER_KM,
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn mean<I: Iterator<Item = f64>>(values: I) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Share of the optional survey fields a trip actually carries.
fn quality_score(trip: &TripRecord) -> f64 {
    let checks = [
        trip.transport_mode != TransportMode::Unknown,
        !trip.purpose.is_empty(),
        trip.distance_km > 0.0,
        trip.duration_minutes > 0.0,
        !trip.start_location.city.is_empty() && !trip.end_location.city.is_empty(),
    ];
    checks.iter().filter(|ok| **ok).count() as f64 / checks.len() as f64
}

/// Computes every analytics payload the backend serves from one dataset.
#[derive(Clone)]
pub struct Runner {
    dataset: Arc<SurveyDataset>,
}

impl Runner {
    pub fn new(dataset: SurveyDataset) -> Self {
        Self {
            dataset: Arc::new(dataset),
        }
    }

    pub fn trips(&self) -> &[TripRecord] {
        &self.dataset.trips
    }

    pub fn food(&self) -> &[FoodRecord] {
        &self.dataset.food
    }

    pub fn initial_active(&self) -> Vec<TrackedEntity> {
        self.dataset.active.clone()
    }

    fn trips_since(&self, days: u32, now: DateTime<Utc>) -> Vec<&TripRecord> {
        let start = now - Duration::days(days as i64);
        self.dataset
            .trips
            .iter()
            .filter(|t| t.created_at.map_or(false, |at| at >= start && at <= now))
            .collect()
    }

    pub fn dashboard_summary(&self) -> DashboardSummary {
        let trips = &self.dataset.trips;
        let food = &self.dataset.food;

        let mut mode_distribution = BTreeMap::new();
        for trip in trips {
            *mode_distribution
                .entry(trip.transport_mode.as_str().to_string())
                .or_insert(0u64) += 1;
        }
        let transport_spending: f64 = trips.iter().map(|t| t.cost).sum();
        let food_spending: f64 = food.iter().map(|f| f.total_cost).sum();
        let restaurants: BTreeSet<&str> = food.iter().map(|f| f.restaurant_name.as_str()).collect();

        DashboardSummary {
            overview: Overview {
                total_trips: trips.len() as u64,
                total_food_entries: food.len() as u64,
                total_transport_spending: round_to(transport_spending, 2),
                total_food_spending: round_to(food_spending, 2),
                total_combined_spending: round_to(transport_spending + food_spending, 2),
            },
            transport_analysis: TransportAnalysis {
                mode_distribution,
                avg_trip_cost: round_to(mean(trips.iter().map(|t| t.cost)), 2),
            },
            food_analysis: FoodAnalysis {
                avg_meal_cost: round_to(mean(food.iter().map(|f| f.total_cost)), 2),
                total_restaurants_visited: restaurants.len() as u64,
            },
        }
    }

    pub fn overview(&self, days: u32, now: DateTime<Utc>) -> ResearchOverview {
        let trips = self.trips_since(days, now);
        let week = self.trips_since(7, now);
        let food_start = now - Duration::days(days as i64);
        let total_users = self.dataset.users.len() as u64;
        let active_users: BTreeSet<&str> = trips.iter().map(|t| t.user_id.as_str()).collect();
        let active_week: BTreeSet<&str> = week.iter().map(|t| t.user_id.as_str()).collect();

        let scores: Vec<f64> = trips.iter().map(|t| quality_score(t)).collect();
        let high = scores.iter().filter(|s| **s >= HIGH_QUALITY).count();

        let emissions_saved: f64 = trips
            .iter()
            .map(|t| (CAR_KG_PER_KM - emission_factor(t.transport_mode)) * t.distance_km)
            .sum();

        ResearchOverview {
            period_days: days,
            total_users,
            active_users: active_users.len() as u64,
            total_trips: trips.len() as u64,
            total_food_entries: self
                .dataset
                .food
                .iter()
                .filter(|f| f.created_at.map_or(false, |at| at >= food_start))
                .count() as u64,
            data_quality: DataQuality {
                avg_quality_score: round_to(mean(scores.iter().copied()), 3),
                high_quality_percentage: round_to(percentage(high as f64, scores.len() as f64), 1),
            },
            user_engagement: UserEngagement {
                active_user_percentage: round_to(
                    percentage(active_users.len() as f64, total_users as f64),
                    1,
                ),
            },
            total_distance_km: round_to(trips.iter().map(|t| t.distance_km).sum(), 1),
            total_emissions_saved_kg: round_to(emissions_saved.max(0.0), 1),
            active_users_last_7_days: active_week.len() as u64,
            avg_trip_duration_minutes: round_to(mean(trips.iter().map(|t| t.duration_minutes)), 1),
            popular_transport_mode: most_common(trips.iter().map(|t| t.transport_mode))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn mode_split(&self, days: u32, now: DateTime<Utc>) -> ModeSplitReport {
        let trips = self.trips_since(days, now);
        let mut groups: BTreeMap<TransportMode, Vec<&TripRecord>> = BTreeMap::new();
        for &trip in &trips {
            groups.entry(trip.transport_mode).or_default().push(trip);
        }

        let total = trips.len() as f64;
        let mut mode_split: Vec<ModeSplitEntry> = groups
            .into_iter()
            .map(|(mode, group)| ModeSplitEntry {
                mode: mode.as_str().to_string(),
                count: group.len() as u64,
                percentage: round_to(percentage(group.len() as f64, total), 2),
                avg_distance_km: round_to(mean(group.iter().map(|t| t.distance_km)), 2),
                avg_cost: round_to(mean(group.iter().map(|t| t.cost)), 2),
                avg_duration_minutes: round_to(mean(group.iter().map(|t| t.duration_minutes)), 1),
            })
            .collect();
        mode_split.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.mode.cmp(&b.mode)));

        ModeSplitReport {
            period_days: days,
            total_trip_segments: trips.len() as u64,
            mode_split,
        }
    }

    pub fn temporal_patterns(
        &self,
        days: u32,
        granularity: Granularity,
        now: DateTime<Utc>,
    ) -> TemporalReport {
        let mut buckets: BTreeMap<u32, Vec<&TripRecord>> = BTreeMap::new();
        for trip in self.trips_since(days, now) {
            let Some(at) = trip.created_at else { continue };
            let key = match granularity {
                Granularity::Hour => at.hour(),
                Granularity::Day => at.weekday().number_from_monday(),
                Granularity::Week => at.iso_week().week(),
            };
            buckets.entry(key).or_default().push(trip);
        }

        let temporal_patterns = buckets
            .into_iter()
            .map(|(key, group)| {
                let users: BTreeSet<&str> = group.iter().map(|t| t.user_id.as_str()).collect();
                TemporalPattern {
                    time_period: key,
                    trip_count: group.len() as u64,
                    unique_users: users.len() as u64,
                    avg_cost: round_to(mean(group.iter().map(|t| t.cost)), 2),
                    most_common_mode: most_common(group.iter().map(|t| t.transport_mode))
                        .map(|m| m.as_str().to_string())
                        .unwrap_or_default(),
                }
            })
            .collect();

        TemporalReport {
            period_days: days,
            granularity,
            temporal_patterns,
        }
    }

    /// One-line summary for offline runs.
    pub fn offline_report(&self, days: u32, now: DateTime<Utc>) -> String {
        let summary = self.dashboard_summary();
        let split = self.mode_split(days, now);
        let modes: Vec<String> = split
            .mode_split
            .iter()
            .map(|m| format!("{}={:.1}%", m.mode, m.percentage))
            .collect();
        format!(
            "trips={} food={} transport_spending={} food_spending={} active={} modes[{}d]={}",
            summary.overview.total_trips,
            summary.overview.total_food_entries,
            summary.overview.total_transport_spending,
            summary.overview.total_food_spending,
            self.dataset.active.len(),
            days,
            modes.join(",")
        )
    }
}

/// Most frequent item; ties go to the smallest.
fn most_common<I: Iterator<Item = TransportMode>>(items: I) -> Option<TransportMode> {
    let mut counts: BTreeMap<TransportMode, usize> = BTreeMap::new();
    for item in items {
        *counts.entry(item).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|(ma, ca), (mb, cb)| ca.cmp(cb).then_with(|| mb.cmp(ma)))
        .map(|(mode, _)| mode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::profile::SurveyUser;
    use tripcore::model::PlaceRef;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2024-12-26T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    fn trip(user: &str, mode: TransportMode, cost: f64, hours_ago: i64) -> TripRecord {
        TripRecord {
            id: format!("{user}-{hours_ago}"),
            transport_mode: mode,
            purpose: "work".into(),
            start_location: PlaceRef {
                city: "Kochi".into(),
                ..Default::default()
            },
            end_location: PlaceRef {
                city: "Ernakulam".into(),
                ..Default::default()
            },
            cost,
            distance_km: 10.0,
            duration_minutes: 30.0,
            number_of_people: 1,
            user_id: user.into(),
            created_at: Some(now() - Duration::hours(hours_ago)),
        }
    }

    fn runner() -> Runner {
        let mut trips = Vec::new();
        for i in 0..40 {
            trips.push(trip("u1", TransportMode::Bus, 20.0, i));
        }
        for i in 0..10 {
            trips.push(trip("u2", TransportMode::Car, 100.0, i));
        }
        trips.push(trip("u3", TransportMode::Walk, 0.0, 24 * 60));
        Runner::new(SurveyDataset {
            users: ["u1", "u2", "u3", "u4"]
                .iter()
                .map(|id| SurveyUser {
                    id: id.to_string(),
                    user_type: "resident".into(),
                })
                .collect(),
            trips,
            food: vec![
                FoodRecord {
                    restaurant_name: "Paragon".into(),
                    total_cost: 100.0,
                    created_at: Some(now()),
                    ..Default::default()
                },
                FoodRecord {
                    restaurant_name: "Paragon".into(),
                    total_cost: 50.0,
                    created_at: Some(now()),
                    ..Default::default()
                },
            ],
            active: Vec::new(),
        })
    }

    #[test]
    fn summary_counts_everything() {
        let summary = runner().dashboard_summary();
        assert_eq!(summary.overview.total_trips, 51);
        assert_eq!(summary.overview.total_food_entries, 2);
        assert_eq!(summary.overview.total_entries(), 53);
        assert_eq!(summary.overview.total_transport_spending, 1800.0);
        assert_eq!(summary.overview.total_combined_spending, 1950.0);
        assert_eq!(summary.transport_analysis.mode_distribution["bus"], 40);
        assert_eq!(summary.food_analysis.total_restaurants_visited, 1);
        assert_eq!(summary.food_analysis.avg_meal_cost, 75.0);
    }

    #[test]
    fn mode_split_respects_the_window() {
        let split = runner().mode_split(30, now());
        assert_eq!(split.total_trip_segments, 50);
        let shares: Vec<(&str, u64, f64)> = split
            .mode_split
            .iter()
            .map(|m| (m.mode.as_str(), m.count, m.percentage))
            .collect();
        assert_eq!(shares, vec![("bus", 40, 80.0), ("car", 10, 20.0)]);
        assert_eq!(split.mode_split[1].avg_cost, 100.0);
    }

    #[test]
    fn overview_measures_engagement() {
        let overview = runner().overview(30, now());
        assert_eq!(overview.total_users, 4);
        assert_eq!(overview.active_users, 2);
        assert_eq!(overview.user_engagement.active_user_percentage, 50.0);
        assert_eq!(overview.data_quality.high_quality_percentage, 100.0);
        assert_eq!(overview.popular_transport_mode, "bus");
        assert_eq!(overview.total_distance_km, 500.0);
        assert!(overview.total_emissions_saved_kg > 0.0);
    }

    #[test]
    fn hourly_buckets_cover_each_trip_once() {
        let report = runner().temporal_patterns(1, Granularity::Hour, now());
        let total: u64 = report.temporal_patterns.iter().map(|p| p.trip_count).sum();
        assert_eq!(total, 35);
        let noon = report
            .temporal_patterns
            .iter()
            .find(|p| p.time_period == 12)
            .unwrap();
        assert_eq!(noon.trip_count, 3);
        assert_eq!(noon.unique_users, 2);
        assert_eq!(noon.most_common_mode, "bus");
    }

    #[test]
    fn empty_window_is_all_zero() {
        let split = runner().mode_split(0, now() - Duration::days(365));
        assert!(split.mode_split.is_empty());
        let overview = runner().overview(7, now() - Duration::days(365));
        assert_eq!(overview.data_quality.high_quality_percentage, 0.0);
    }
}
