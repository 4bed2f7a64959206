use crate::api::config::ApiConfig;
use crate::model::{
    ApiEnvelope, DashboardSummary, FoodRecord, Granularity, ModeSplitReport, ResearchOverview,
    TemporalReport, TrackedEntity, TripRecord,
};
use crate::prelude::{DashboardError, DashboardResult};
use crate::registry::feed::SnapshotSource;
use crate::telemetry::LogManager;
use crate::view::controller::{DashboardData, DashboardSource, DashboardVariant, FetchRequest};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;

pub const SUMMARY_PATH: &str = "/api/v1/analytics/dashboard-summary";
pub const TRIPS_PATH: &str = "/api/v1/trips";
pub const FOOD_PATH: &str = "/api/v1/food";
pub const OVERVIEW_PATH: &str = "/analytics/dashboard/overview";
pub const MODE_SPLIT_PATH: &str = "/analytics/trips/mode-split";
pub const TEMPORAL_PATH: &str = "/analytics/trips/temporal-patterns";
pub const ACTIVE_TRIPS_PATH: &str = "/analytics/live/active-trips";

/// HTTP client for the analytics backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: Arc<ApiConfig>,
    logger: LogManager,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> DashboardResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DashboardError::Config(format!("building HTTP client: {e}")))?;
        Ok(Self {
            http,
            config: Arc::new(config),
            logger: LogManager::new("tripcore::api"),
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn send(&self, path: &str) -> DashboardResult<reqwest::Response> {
        let url = self.config.endpoint(path);
        let mut request = self.http.get(&url);
        if let Some(token) = self.config.token.bearer_token() {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|err| {
            self.logger.warn(&format!("GET {url} failed: {err}"));
            DashboardError::from(err)
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = error_detail(&body, status);
            self.logger.warn(&format!("GET {url} -> {status}: {detail}"));
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                self.config.token.reload();
            }
            return Err(DashboardError::Status {
                status: status.as_u16(),
                detail,
            });
        }
        self.logger.trace(&format!("GET {url} -> {status}"));
        Ok(response)
    }

    async fn get_raw<T: DeserializeOwned>(&self, path: &str) -> DashboardResult<T> {
        let bytes = self.send(path).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_enveloped<T: DeserializeOwned + Default>(&self, path: &str) -> DashboardResult<T> {
        self.get_raw::<ApiEnvelope<T>>(path).await?.into_data()
    }

    pub async fn dashboard_summary(&self) -> DashboardResult<DashboardSummary> {
        self.get_enveloped(SUMMARY_PATH).await
    }

    pub async fn trips(&self) -> DashboardResult<Vec<TripRecord>> {
        self.get_enveloped(TRIPS_PATH).await
    }

    pub async fn food(&self) -> DashboardResult<Vec<FoodRecord>> {
        self.get_enveloped(FOOD_PATH).await
    }

    pub async fn overview(&self, days: u32) -> DashboardResult<ResearchOverview> {
        self.get_raw(&format!("{OVERVIEW_PATH}?days={days}")).await
    }

    pub async fn mode_split(&self, days: u32) -> DashboardResult<ModeSplitReport> {
        self.get_raw(&format!("{MODE_SPLIT_PATH}?days={days}")).await
    }

    pub async fn temporal_patterns(
        &self,
        days: u32,
        granularity: Granularity,
    ) -> DashboardResult<TemporalReport> {
        self.get_raw(&format!(
            "{TEMPORAL_PATH}?days={days}&granularity={granularity}"
        ))
        .await
    }

    pub async fn active_trips(&self) -> DashboardResult<Vec<TrackedEntity>> {
        let trips: Option<Vec<TrackedEntity>> = self.get_raw(ACTIVE_TRIPS_PATH).await?;
        Ok(trips.unwrap_or_default())
    }
}

impl DashboardSource for ApiClient {
    async fn fetch_dashboard(&self, request: &FetchRequest) -> DashboardResult<DashboardData> {
        match request.variant {
            DashboardVariant::Summary => {
                let (summary, trips, food) =
                    tokio::try_join!(self.dashboard_summary(), self.trips(), self.food())?;
                Ok(DashboardData::Summary {
                    summary,
                    trips,
                    food,
                })
            }
            DashboardVariant::Research | DashboardVariant::Extended => {
                let (overview, mode_split, temporal) = tokio::try_join!(
                    self.overview(request.days),
                    self.mode_split(request.days),
                    self.temporal_patterns(request.days, Granularity::Hour)
                )?;
                Ok(DashboardData::Research {
                    overview,
                    mode_split,
                    temporal,
                })
            }
        }
    }
}

impl SnapshotSource for ApiClient {
    async fn fetch_snapshot(&self) -> DashboardResult<Vec<TrackedEntity>> {
        self.active_trips().await
    }
}

/// Prefers a JSON `detail` field, then the raw body, then the status reason.
fn error_detail(body: &str, status: StatusCode) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| match value.get("detail") {
            Some(serde_json::Value::String(detail)) => Some(detail.clone()),
            Some(other) if !other.is_null() => Some(other.to_string()),
            _ => None,
        });
    if let Some(detail) = from_json {
        return detail;
    }
    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= 200 {
        return trimmed.to_string();
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}
