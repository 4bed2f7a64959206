use crate::generator::movement::MovementConfig;
use crate::generator::profile::GeneratorConfig;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}

fn default_tick_ms() -> u64 {
    2_000
}

fn default_periodic_secs() -> u64 {
    30
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulatorConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
    #[serde(default = "default_periodic_secs")]
    pub periodic_secs: u64,
    /// When set, HTTP routes require `Authorization: Bearer <token>`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub movement: MovementConfig,
}

impl SimulatorConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading simulator config {}", path_ref.display()))?;
        let config: SimulatorConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing simulator config {}", path_ref.display()))?;
        config
            .validate()
            .with_context(|| format!("validating simulator config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Rejects movement parameters the random walk cannot sample from.
    pub fn validate(&self) -> anyhow::Result<()> {
        let movement = &self.movement;
        ensure!(
            movement.step_deg.is_finite() && movement.step_deg >= 0.0,
            "movement.step_deg must be a non-negative number, got {}",
            movement.step_deg
        );
        for (field, value) in [
            ("completion_probability", movement.completion_probability),
            ("start_probability", movement.start_probability),
            ("food_probability", movement.food_probability),
        ] {
            ensure!(
                (0.0..=1.0).contains(&value),
                "movement.{field} must be between 0 and 1, got {value}"
            );
        }
        Ok(())
    }

    pub fn from_args(bind: SocketAddr, tick_ms: u64, seed: u64, token: Option<String>) -> Self {
        Self {
            bind,
            tick_ms,
            periodic_secs: default_periodic_secs(),
            token: token.filter(|t| !t.trim().is_empty()),
            generator: GeneratorConfig {
                seed,
                ..Default::default()
            },
            movement: MovementConfig::default(),
        }
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(50))
    }

    pub fn periodic(&self) -> Duration {
        Duration::from_secs(self.periodic_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn config_from_args_drops_blank_token() {
        let cfg = SimulatorConfig::from_args(DEFAULT_BIND.parse().unwrap(), 500, 3, Some("  ".into()));
        assert_eq!(cfg.token, None);
        assert_eq!(cfg.generator.seed, 3);
        assert_eq!(cfg.tick(), Duration::from_millis(500));
    }

    #[test]
    fn config_load_reads_yaml() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(
            b"bind: 0.0.0.0:9100\ntoken: secret\ngenerator:\n  seed: 11\n  trips: 20\nmovement:\n  max_active: 4\n",
        )
        .unwrap();
        let path = temp.into_temp_path();
        let cfg = SimulatorConfig::load(&path).unwrap();
        assert_eq!(cfg.bind.port(), 9100);
        assert_eq!(cfg.token.as_deref(), Some("secret"));
        assert_eq!(cfg.generator.trips, 20);
        assert_eq!(cfg.generator.food_entries, GeneratorConfig::default().food_entries);
        assert_eq!(cfg.movement.max_active, 4);
        assert_eq!(cfg.tick_ms, 2_000);
    }

    #[test]
    fn config_load_rejects_unusable_movement() {
        let mut negative = NamedTempFile::new().unwrap();
        negative.write_all(b"movement:\n  step_deg: -0.01\n").unwrap();
        let err = SimulatorConfig::load(negative.path()).unwrap_err();
        assert!(format!("{err:#}").contains("movement.step_deg"));

        let mut nan = NamedTempFile::new().unwrap();
        nan.write_all(b"movement:\n  food_probability: .nan\n").unwrap();
        let err = SimulatorConfig::load(nan.path()).unwrap_err();
        assert!(format!("{err:#}").contains("movement.food_probability"));

        let mut zero = NamedTempFile::new().unwrap();
        zero.write_all(b"movement:\n  step_deg: 0.0\n  start_probability: 1.0\n").unwrap();
        assert!(SimulatorConfig::load(zero.path()).is_ok());
    }

    #[test]
    fn config_load_reports_missing_file() {
        let err = SimulatorConfig::load("/nonexistent/simulator.yaml").unwrap_err();
        assert!(err.to_string().contains("reading simulator config"));
    }
}
