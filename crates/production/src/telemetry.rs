//! Tracing subscriber setup.

use crate::{ConfigError, RunnerConfig};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence over `default_filter`. Fails if a global
/// subscriber is already installed.
pub fn init_tracing(default_filter: &str) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => parse_filter(default_filter)?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .map_err(|e| ConfigError::Telemetry(e.to_string()))
}

/// Install a global fmt subscriber filtered by `config.log_filter`.
pub fn init_from_config(config: &RunnerConfig) -> Result<(), ConfigError> {
    init_tracing(&config.log_filter)
}

/// Parse a filter directive such as `"derec_tracker=debug,info"`.
pub fn parse_filter(directive: &str) -> Result<EnvFilter, ConfigError> {
    EnvFilter::try_new(directive).map_err(|e| ConfigError::Telemetry(e.to_string()))
}
