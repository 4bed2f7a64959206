use crate::prelude::{DashboardError, DashboardResult};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const LIVE_SOCKET_PATH: &str = "/ws/live-dashboard";
pub const DEFAULT_CHANNELS: [&str; 2] = ["live_tracking", "trip_completions"];

/// Supplies the bearer token attached to each request, if any.
pub trait TokenProvider: Send + Sync + fmt::Debug {
    fn bearer_token(&self) -> Option<String>;

    /// Called after the backend rejects a request as unauthorized.
    fn reload(&self) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn bearer_token(&self) -> Option<String> {
        None
    }
}

#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Token persisted in a local file. Read once on construction and again on
/// `reload`, which the client triggers after a 401/403 so a new login is
/// picked up without restarting. A missing or blank file means no token.
#[derive(Debug, Clone)]
pub struct TokenFile {
    path: PathBuf,
    cached: Arc<RwLock<Option<String>>>,
}

impl TokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cached = Arc::new(RwLock::new(read_token(&path)));
        Self { path, cached }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn read_token(path: &Path) -> Option<String> {
    let contents = fs::read_to_string(path).ok()?;
    let token = contents.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

impl TokenProvider for TokenFile {
    fn bearer_token(&self) -> Option<String> {
        self.cached.read().ok().and_then(|token| token.clone())
    }

    fn reload(&self) {
        let fresh = read_token(&self.path);
        if let Ok(mut cached) = self.cached.write() {
            *cached = fresh;
        }
    }
}

/// Connection settings for the analytics backend.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub refresh_interval: Duration,
    pub channels: Vec<String>,
    pub token: Arc<dyn TokenProvider>,
}

impl ApiConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(10),
            refresh_interval: Duration::from_secs(30),
            channels: DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect(),
            token: Arc::new(NoToken),
        }
    }

    pub fn with_token(mut self, token: impl TokenProvider + 'static) -> Self {
        self.token = Arc::new(token);
        self
    }

    /// Reads `TRIPDASH_*` environment variables, falling back to defaults.
    pub fn from_env() -> DashboardResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> DashboardResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("TRIPDASH_API_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url);

        if let Some(raw) = lookup("TRIPDASH_TIMEOUT_MS") {
            let millis: u64 = raw
                .parse()
                .map_err(|_| DashboardError::Config(format!("TRIPDASH_TIMEOUT_MS={raw}")))?;
            config.timeout = Duration::from_millis(millis);
        }
        if let Some(raw) = lookup("TRIPDASH_REFRESH_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| DashboardError::Config(format!("TRIPDASH_REFRESH_SECS={raw}")))?;
            config.refresh_interval = Duration::from_secs(secs.max(1));
        }

        if let Some(token) = lookup("TRIPDASH_TOKEN").filter(|t| !t.trim().is_empty()) {
            config = config.with_token(StaticToken(token.trim().to_string()));
        } else if let Some(path) = lookup("TRIPDASH_TOKEN_FILE") {
            config = config.with_token(TokenFile::new(path));
        }

        config.live_socket_url()?;
        Ok(config)
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// WebSocket URL derived from the HTTP base URL.
    pub fn live_socket_url(&self) -> DashboardResult<String> {
        let rest = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            return Err(DashboardError::Config(format!(
                "base URL must start with http:// or https://, got {}",
                self.base_url
            )));
        };
        Ok(format!("{rest}{LIVE_SOCKET_PATH}"))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
