use crate::model::{
    DashboardSummary, FoodRecord, ModeSplitReport, ResearchOverview, TemporalReport, TripRecord,
};
use crate::prelude::DashboardResult;
use std::fmt;
use std::future::Future;

/// Day windows offered by the time filter.
pub const TIME_FILTERS: [u32; 4] = [7, 30, 90, 365];
pub const DEFAULT_DAYS: u32 = 30;

/// Which page of the dashboard is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DashboardVariant {
    /// Spending summary with the latest trip and food records.
    #[default]
    Summary,
    /// Overview, mode split with averages and the hourly pattern.
    Research,
    /// Research data with distance and emission cards.
    Extended,
}

impl DashboardVariant {
    pub const ALL: [DashboardVariant; 3] = [
        DashboardVariant::Summary,
        DashboardVariant::Research,
        DashboardVariant::Extended,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            DashboardVariant::Summary => "Summary",
            DashboardVariant::Research => "Research",
            DashboardVariant::Extended => "Extended",
        }
    }

    /// Whether the page honours the day filter.
    pub fn uses_time_filter(&self) -> bool {
        !matches!(self, DashboardVariant::Summary)
    }
}

impl fmt::Display for DashboardVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parameters of one dashboard load. Two equal requests hit the same endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FetchRequest {
    pub variant: DashboardVariant,
    pub days: u32,
}

impl Default for FetchRequest {
    fn default() -> Self {
        Self {
            variant: DashboardVariant::default(),
            days: DEFAULT_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DashboardData {
    Summary {
        summary: DashboardSummary,
        trips: Vec<TripRecord>,
        food: Vec<FoodRecord>,
    },
    Research {
        overview: ResearchOverview,
        mode_split: ModeSplitReport,
        temporal: TemporalReport,
    },
}

/// Anything that can answer a [`FetchRequest`].
pub trait DashboardSource: Send + Sync {
    fn fetch_dashboard(
        &self,
        request: &FetchRequest,
    ) -> impl Future<Output = DashboardResult<DashboardData>> + Send;
}

/// Fetches `request` and renders any error for display.
pub async fn load<S: DashboardSource>(
    source: &S,
    request: FetchRequest,
) -> (FetchRequest, Result<DashboardData, String>) {
    let result = source
        .fetch_dashboard(&request)
        .await
        .map_err(|e| e.to_string());
    (request, result)
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading(FetchRequest),
    Failed {
        request: FetchRequest,
        message: String,
    },
    Ready {
        request: FetchRequest,
        data: DashboardData,
    },
}

/// Loading/error/data state of the dashboard page.
///
/// Responses for anything but the latest request are dropped, so a slow
/// answer to an old filter never replaces a newer one.
#[derive(Debug, Clone, Default)]
pub struct DashboardController {
    request: FetchRequest,
    state: LoadState,
    /// Last good data, kept on screen while a reload is in flight.
    last_data: Option<DashboardData>,
}

impl DashboardController {
    pub fn new(request: FetchRequest) -> Self {
        Self {
            request,
            state: LoadState::Idle,
            last_data: None,
        }
    }

    pub fn current_request(&self) -> FetchRequest {
        self.request
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Marks `request` in flight and returns it for dispatch.
    pub fn begin(&mut self, request: FetchRequest) -> FetchRequest {
        if let LoadState::Ready { data, .. } = std::mem::take(&mut self.state) {
            self.last_data = Some(data);
        }
        self.request = request;
        self.state = LoadState::Loading(request);
        request
    }

    /// Re-issues the current request.
    pub fn refresh(&mut self) -> FetchRequest {
        self.begin(self.request)
    }

    pub fn select_variant(&mut self, variant: DashboardVariant) -> Option<FetchRequest> {
        if variant == self.request.variant {
            return None;
        }
        // Cached data belongs to the other page's shape.
        self.last_data = None;
        Some(self.begin(FetchRequest {
            variant,
            ..self.request
        }))
    }

    pub fn select_days(&mut self, days: u32) -> Option<FetchRequest> {
        if days == self.request.days {
            return None;
        }
        Some(self.begin(FetchRequest { days, ..self.request }))
    }

    /// Records the outcome of `request`. Returns false when it was stale.
    pub fn finish(&mut self, request: FetchRequest, result: Result<DashboardData, String>) -> bool {
        if request != self.request || !matches!(self.state, LoadState::Loading(_)) {
            return false;
        }
        self.state = match result {
            Ok(data) => {
                self.last_data = None;
                LoadState::Ready { request, data }
            }
            Err(message) => LoadState::Failed { request, message },
        };
        true
    }

    /// After a failure, restarts the identical request.
    pub fn retry(&mut self) -> Option<FetchRequest> {
        match self.state {
            LoadState::Failed { request, .. } => Some(self.begin(request)),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading(_))
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            LoadState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Data to render: the current result, or the previous one while loading.
    pub fn data(&self) -> Option<&DashboardData> {
        match &self.state {
            LoadState::Ready { data, .. } => Some(data),
            LoadState::Loading(_) => self.last_data.as_ref(),
            _ => None,
        }
    }
}
