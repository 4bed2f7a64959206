use crate::channel::ConnectionState;
use crate::model::{
    DashboardSummary, FoodRecord, Granularity, ModeSplitReport, ResearchOverview,
    TemporalReport, TrackedEntity, TripRecord,
};
use crate::view::controller::{DashboardData, DashboardVariant};
use crate::view::format::{
    format_count, format_currency, format_currency_fixed, format_number, format_percent,
    percentage,
};
use crate::view::map::{MapMarker, MapViewport};
use crate::view::widgets::{
    Accent, Badge, ModeShare, Section, StatCard, TableView, TemporalPoint,
};
use std::cmp::Reverse;

const TITLE: &str = "Kerala Transport Analytics";
const RECENT_ROWS: usize = 10;

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub title: String,
    pub subtitle: String,
    pub cards: Vec<StatCard>,
    pub mode_shares: Vec<ModeShare>,
    pub sections: Vec<Section>,
    pub tables: Vec<TableView>,
    pub temporal: Vec<TemporalPoint>,
    pub markers: Vec<MapMarker>,
    pub viewport: MapViewport,
    pub connection: Badge,
    pub active_trips: String,
}

/// Builds the frame for `variant` from the fetched `data` and the live snapshot.
///
/// Without data only the live parts are filled in.
pub fn project(
    variant: DashboardVariant,
    data: Option<&DashboardData>,
    live: &[TrackedEntity],
    connection: ConnectionState,
) -> DashboardView {
    let markers: Vec<MapMarker> = live.iter().map(MapMarker::from_entity).collect();
    let viewport = MapViewport::fit(&markers);

    let mut view = DashboardView {
        title: TITLE.to_string(),
        subtitle: match variant {
            DashboardVariant::Summary => {
                "Real-time insights into transportation and food patterns".to_string()
            }
            _ => "Real-time insights into Kerala's smart transportation ecosystem".to_string(),
        },
        cards: Vec::new(),
        mode_shares: Vec::new(),
        sections: Vec::new(),
        tables: Vec::new(),
        temporal: Vec::new(),
        markers,
        viewport,
        connection: Badge {
            label: connection.to_string(),
            live: connection.is_live(),
        },
        active_trips: match live.len() {
            1 => "1 Active Trip".to_string(),
            n => format!("{n} Active Trips"),
        },
    };

    match data {
        Some(DashboardData::Summary {
            summary,
            trips,
            food,
        }) => summary_page(&mut view, summary, trips, food),
        Some(DashboardData::Research {
            overview,
            mode_split,
            temporal,
        }) => {
            if variant == DashboardVariant::Extended {
                extended_cards(&mut view, overview);
            } else {
                research_cards(&mut view, overview, mode_split.period_days);
            }
            research_modes(&mut view, mode_split);
            view.temporal = temporal_points(temporal);
        }
        None => {}
    }
    view
}

/// Mode shares against `whole`, largest first.
pub fn mode_shares<'a, I>(counts: I, whole: f64, decimals: usize) -> Vec<ModeShare>
where
    I: IntoIterator<Item = (&'a str, u64)>,
{
    let mut shares: Vec<ModeShare> = counts
        .into_iter()
        .map(|(mode, count)| {
            let share = percentage(count as f64, whole);
            ModeShare {
                mode: mode.replace('_', " "),
                count,
                percentage: share,
                label: format!("{} ({} trips)", format_percent(share, decimals), count),
            }
        })
        .collect();
    shares.sort_by_key(|s| (Reverse(s.count), s.mode.clone()));
    shares
}

fn summary_page(
    view: &mut DashboardView,
    summary: &DashboardSummary,
    trips: &[TripRecord],
    food: &[FoodRecord],
) {
    let overview = &summary.overview;
    let transport = &summary.transport_analysis;

    view.cards = vec![
        StatCard::new("Total Entries", format_count(overview.total_entries()), Accent::Primary),
        StatCard::new("Total Trips", format_count(overview.total_trips), Accent::Success),
        StatCard::new(
            "Transport Spending",
            format_currency(overview.total_transport_spending),
            Accent::Info,
        ),
        StatCard::new(
            "Avg Trip Cost",
            format_currency_fixed(transport.avg_trip_cost, 0),
            Accent::Warning,
        ),
    ];

    view.mode_shares = mode_shares(
        transport
            .mode_distribution
            .iter()
            .map(|(mode, count)| (mode.as_str(), *count)),
        overview.total_trips as f64,
        0,
    );

    view.sections = vec![
        Section {
            title: "Transport Analysis".to_string(),
            lines: vec![
                (
                    "Total Trips".to_string(),
                    format!("{} trips recorded", overview.total_trips),
                ),
                (
                    "Average Cost per Trip".to_string(),
                    format_currency_fixed(transport.avg_trip_cost, 2),
                ),
                (
                    "Total Transport Spending".to_string(),
                    format_currency(overview.total_transport_spending),
                ),
            ],
        },
        Section {
            title: "Food Analysis".to_string(),
            lines: vec![
                (
                    "Food Entries".to_string(),
                    format!("{} entries recorded", overview.total_food_entries),
                ),
                (
                    "Restaurants Visited".to_string(),
                    format!("{} restaurants", summary.food_analysis.total_restaurants_visited),
                ),
                (
                    "Food Spending".to_string(),
                    format_currency(overview.total_food_spending),
                ),
            ],
        },
    ];

    view.tables = vec![trip_table(trips), food_table(food)];
}

fn trip_table(trips: &[TripRecord]) -> TableView {
    let mut recent: Vec<&TripRecord> = trips.iter().collect();
    recent.sort_by_key(|t| Reverse(t.created_at));
    TableView {
        title: "Recent Trips".to_string(),
        headers: ["Mode", "Purpose", "Route", "Distance", "Cost", "People"]
            .map(String::from)
            .to_vec(),
        rows: recent
            .into_iter()
            .take(RECENT_ROWS)
            .map(|t| {
                vec![
                    t.transport_mode.label(),
                    t.purpose.clone(),
                    format!("{} → {}", t.start_location.city, t.end_location.city),
                    format!("{} km", format_number(t.distance_km)),
                    format_currency(t.cost),
                    t.number_of_people.to_string(),
                ]
            })
            .collect(),
    }
}

fn food_table(food: &[FoodRecord]) -> TableView {
    let mut recent: Vec<&FoodRecord> = food.iter().collect();
    recent.sort_by_key(|f| Reverse(f.created_at));
    TableView {
        title: "Recent Meals".to_string(),
        headers: ["Restaurant", "Cuisine", "Meal", "City", "Cost", "People"]
            .map(String::from)
            .to_vec(),
        rows: recent
            .into_iter()
            .take(RECENT_ROWS)
            .map(|f| {
                vec![
                    f.restaurant_name.clone(),
                    f.cuisine_type.clone(),
                    f.meal_type.clone(),
                    f.location.city.clone(),
                    format_currency(f.total_cost),
                    f.number_of_people.to_string(),
                ]
            })
            .collect(),
    }
}

fn research_cards(view: &mut DashboardView, overview: &ResearchOverview, days: u32) {
    let quality = &overview.data_quality;
    view.cards = vec![
        StatCard::new("Total Users", format_count(overview.total_users), Accent::Primary)
            .with_caption(format!(
                "{}% active",
                format_number(overview.user_engagement.active_user_percentage)
            )),
        StatCard::new("Total Trips", format_count(overview.total_trips), Accent::Success)
            .with_caption(format!("Last {days} days")),
        StatCard::new(
            "Food Entries",
            format_count(overview.total_food_entries),
            Accent::Info,
        )
        .with_caption("Cultural data points".to_string()),
        StatCard::new(
            "Data Quality",
            format_percent(quality.avg_quality_score * 100.0, 0),
            Accent::Warning,
        )
        .with_caption(format!(
            "{}% high quality",
            format_number(quality.high_quality_percentage)
        )),
    ];
}

fn extended_cards(view: &mut DashboardView, overview: &ResearchOverview) {
    let popular = if overview.popular_transport_mode.is_empty() {
        "n/a".to_string()
    } else {
        overview.popular_transport_mode.replace('_', " ")
    };
    view.cards = vec![
        StatCard::new("Total Users", format_count(overview.total_users), Accent::Primary)
            .with_caption("Active users in system".to_string()),
        StatCard::new("Total Trips", format_count(overview.total_trips), Accent::Success)
            .with_caption("Trips completed".to_string()),
        StatCard::new(
            "Distance Traveled",
            format!("{} km", format_number(overview.total_distance_km)),
            Accent::Info,
        )
        .with_caption("Total distance covered".to_string()),
        StatCard::new(
            "CO₂ Saved",
            format!("{} kg", format_number(overview.total_emissions_saved_kg)),
            Accent::Warning,
        )
        .with_caption("Environmental impact".to_string()),
        StatCard::new(
            "Active (7 days)",
            format_count(overview.active_users_last_7_days),
            Accent::Neutral,
        ),
        StatCard::new(
            "Avg Trip Duration",
            format!("{} min", format_number(overview.avg_trip_duration_minutes)),
            Accent::Neutral,
        ),
        StatCard::new("Popular Mode", popular, Accent::Neutral),
    ];
}

/// Shares are recomputed from counts; the backend's rounded `percentage`
/// field is not used so bars and table rows always agree.
fn research_modes(view: &mut DashboardView, report: &ModeSplitReport) {
    let counted: u64 = report.mode_split.iter().map(|m| m.count).sum();
    let whole = if report.total_trip_segments > 0 {
        report.total_trip_segments
    } else {
        counted
    };

    view.mode_shares = mode_shares(
        report.mode_split.iter().map(|m| (m.mode.as_str(), m.count)),
        whole as f64,
        1,
    );

    let mut entries: Vec<_> = report.mode_split.iter().collect();
    entries.sort_by_key(|m| Reverse(m.count));
    view.tables = vec![TableView {
        title: "Detailed Transport Mode Statistics".to_string(),
        headers: ["Mode", "Trip Count", "Percentage", "Avg Distance (km)", "Avg Cost (₹)"]
            .map(String::from)
            .to_vec(),
        rows: entries
            .into_iter()
            .map(|m| {
                vec![
                    m.mode.replace('_', " "),
                    format_count(m.count),
                    format_percent(percentage(m.count as f64, whole as f64), 1),
                    format!("{:.1}", m.avg_distance_km),
                    format_currency_fixed(m.avg_cost, 2),
                ]
            })
            .collect(),
    }];
}

fn temporal_points(report: &TemporalReport) -> Vec<TemporalPoint> {
    let mut patterns: Vec<_> = report.temporal_patterns.iter().collect();
    patterns.sort_by_key(|p| p.time_period);
    patterns
        .into_iter()
        .map(|p| TemporalPoint {
            label: match report.granularity {
                Granularity::Hour => format!("{}:00", p.time_period),
                Granularity::Day => format!("Day {}", p.time_period),
                Granularity::Week => format!("Week {}", p.time_period),
            },
            trips: p.trip_count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        ModeSplitEntry, Overview, Position, TemporalPattern, TransportAnalysis, TransportMode,
    };

    fn summary(trips: u64, food: u64, modes: &[(&str, u64)]) -> DashboardData {
        DashboardData::Summary {
            summary: DashboardSummary {
                overview: Overview {
                    total_trips: trips,
                    total_food_entries: food,
                    total_transport_spending: 1250.5,
                    ..Default::default()
                },
                transport_analysis: TransportAnalysis {
                    mode_distribution: modes.iter().map(|(m, c)| (m.to_string(), *c)).collect(),
                    avg_trip_cost: 25.01,
                },
                ..Default::default()
            },
            trips: Vec::new(),
            food: Vec::new(),
        }
    }

    #[test]
    fn total_entries_adds_trips_and_food() {
        let data = summary(100, 50, &[]);
        let view = project(
            DashboardVariant::Summary,
            Some(&data),
            &[],
            ConnectionState::Open,
        );
        assert_eq!(view.cards[0].title, "Total Entries");
        assert_eq!(view.cards[0].value, "150");
        assert_eq!(view.cards[2].value, "₹1,250.5");
        assert_eq!(view.cards[3].value, "₹25");
    }

    #[test]
    fn mode_distribution_shares_total_trips() {
        let data = summary(50, 0, &[("car", 10), ("bus", 40)]);
        let view = project(
            DashboardVariant::Summary,
            Some(&data),
            &[],
            ConnectionState::Open,
        );
        let shares: Vec<(&str, f64)> = view
            .mode_shares
            .iter()
            .map(|s| (s.mode.as_str(), s.percentage))
            .collect();
        assert_eq!(shares, vec![("bus", 80.0), ("car", 20.0)]);
        assert_eq!(view.mode_shares[0].label, "80% (40 trips)");
    }

    #[test]
    fn zero_trips_gives_zero_shares() {
        let data = summary(0, 0, &[("walk", 0)]);
        let view = project(
            DashboardVariant::Summary,
            Some(&data),
            &[],
            ConnectionState::Open,
        );
        assert_eq!(view.mode_shares[0].percentage, 0.0);
    }

    #[test]
    fn research_page_uses_mode_split_and_hours() {
        let data = DashboardData::Research {
            overview: ResearchOverview {
                total_users: 1200,
                ..Default::default()
            },
            mode_split: ModeSplitReport {
                period_days: 30,
                total_trip_segments: 0,
                mode_split: vec![
                    ModeSplitEntry {
                        mode: "auto_rickshaw".into(),
                        count: 1,
                        avg_cost: 40.0,
                        ..Default::default()
                    },
                    ModeSplitEntry {
                        mode: "bus".into(),
                        count: 2,
                        ..Default::default()
                    },
                ],
            },
            temporal: TemporalReport {
                temporal_patterns: vec![
                    TemporalPattern {
                        time_period: 17,
                        trip_count: 4,
                        ..Default::default()
                    },
                    TemporalPattern {
                        time_period: 8,
                        trip_count: 9,
                        ..Default::default()
                    },
                ],
                ..Default::default()
            },
        };
        let view = project(
            DashboardVariant::Research,
            Some(&data),
            &[],
            ConnectionState::Closed,
        );
        assert_eq!(view.cards[0].value, "1,200");
        assert_eq!(view.cards[1].caption.as_deref(), Some("Last 30 days"));
        assert_eq!(view.mode_shares[0].label, "66.7% (2 trips)");
        assert_eq!(view.mode_shares[1].mode, "auto rickshaw");
        assert_eq!(view.tables[0].rows[1][4], "₹40.00");
        assert_eq!(view.temporal[0].label, "8:00");
        assert!(!view.connection.live);
        assert_eq!(view.connection.label, "Disconnected");
    }

    #[test]
    fn research_shares_ignore_backend_rounding() {
        let data = DashboardData::Research {
            overview: ResearchOverview::default(),
            mode_split: ModeSplitReport {
                period_days: 7,
                total_trip_segments: 4,
                mode_split: vec![ModeSplitEntry {
                    mode: "train".into(),
                    count: 1,
                    percentage: 33.33,
                    ..Default::default()
                }],
            },
            temporal: TemporalReport::default(),
        };
        let view = project(DashboardVariant::Research, Some(&data), &[], ConnectionState::Open);
        assert_eq!(view.mode_shares[0].percentage, 25.0);
        assert_eq!(view.tables[0].rows[0][2], "25.0%");
    }

    #[test]
    fn live_trips_become_markers() {
        let live = vec![
            TrackedEntity::new("a", Position::new(8.5, 76.9), TransportMode::Bus),
            TrackedEntity::new("b", Position::new(8.6, 77.0), TransportMode::Walk),
        ];
        let view = project(DashboardVariant::Extended, None, &live, ConnectionState::Open);
        assert!(view.cards.is_empty());
        assert_eq!(view.markers.len(), 2);
        assert_eq!(view.active_trips, "2 Active Trips");
        assert_eq!(view.connection.label, "Live");
    }
}
