//! Projection of registry snapshots and aggregate statistics into widget
//! descriptions. Nothing here mutates the registry.

pub mod controller;
pub mod format;
pub mod map;
pub mod projection;
pub mod widgets;

pub use controller::{
    DashboardController, DashboardData, DashboardSource, DashboardVariant, FetchRequest, LoadState,
    TIME_FILTERS,
};
pub use map::{MapMarker, MapViewport, Rgb};
pub use projection::{project, DashboardView};
pub use widgets::{Accent, Badge, ModeShare, Section, StatCard, TableView, TemporalPoint};
