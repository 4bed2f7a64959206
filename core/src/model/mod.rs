pub mod analytics;
pub mod envelope;
pub mod lenient;
pub mod records;
pub mod trip;

pub use analytics::{
    DashboardSummary, DataQuality, FoodAnalysis, Granularity, ModeSplitEntry, ModeSplitReport,
    Overview, ResearchOverview, TemporalPattern, TemporalReport, TransportAnalysis,
    UserEngagement,
};
pub use envelope::ApiEnvelope;
pub use records::{FoodRecord, PlaceRef, TripRecord};
pub use trip::{Position, TrackedEntity, TransportMode, TripSummary};
