//! Runner configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file is valid:
//!
//! ```toml
//! round_timeout_secs = 120
//! log_filter = "derec=debug,info"
//! ```

use derec_tracker::TrackerConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Failed to install tracing subscriber: {0}")]
    Telemetry(String),
}

/// Configuration for a [`StatusRunner`](crate::StatusRunner).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunnerConfig {
    /// Seconds a round waits for pending helpers before completing.
    pub round_timeout_secs: u64,

    /// `tracing` filter directive used when `RUST_LOG` is not set. Read by
    /// [`init_from_config`](crate::telemetry::init_from_config).
    pub log_filter: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            round_timeout_secs: 60,
            log_filter: "info".to_string(),
        }
    }
}

impl RunnerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: RunnerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.round_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "round_timeout_secs must be greater than 0".to_string(),
            ));
        }
        crate::telemetry::parse_filter(&self.log_filter)?;
        Ok(())
    }

    pub fn round_timeout(&self) -> Duration {
        Duration::from_secs(self.round_timeout_secs)
    }

    /// Tracker configuration derived from this config.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig::with_round_timeout(self.round_timeout())
    }
}
