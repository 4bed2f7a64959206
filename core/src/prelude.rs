/// Common error type for dashboard data access.
#[derive(thiserror::Error, Debug)]
pub enum DashboardError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("request unsuccessful: {0}")]
    Envelope(String),
    #[error("malformed payload: {0}")]
    Decode(String),
    #[error("channel error: {0}")]
    Channel(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type DashboardResult<T> = Result<T, DashboardError>;

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashboardError::Decode(err.to_string())
        } else {
            DashboardError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for DashboardError {
    fn from(err: serde_json::Error) -> Self {
        DashboardError::Decode(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for DashboardError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        DashboardError::Channel(err.to_string())
    }
}
