//! Core data flow for the transport survey dashboard.
//!
//! The modules follow the dashboard's one-way pipeline: the API client and the
//! real-time channel feed the live trip registry, and the view layer projects
//! registry snapshots and aggregate statistics into widget descriptions.

pub mod api;
pub mod channel;
pub mod model;
pub mod prelude;
pub mod registry;
pub mod telemetry;
pub mod view;

pub use prelude::{DashboardError, DashboardResult};
