//! Production runner for the DeRec status subsystem.
//!
//! Wires the synchronous state machines to the outside world:
//!
//! - Outcomes from the transport → `OperationTracker` per round
//! - Round verdict changes → `SecretAggregator` per secret
//! - Pairing transitions from the pairing manager → `SecretAggregator`
//! - Every notification → `NotificationDispatcher`
//!
//! Round timeouts are tokio timers owned by the runner. Configuration is
//! loaded from TOML and logging goes through `tracing`.

mod config;
mod error;
mod runner;
pub mod telemetry;

pub use config::{ConfigError, RunnerConfig};
pub use error::RunnerError;
pub use runner::{RoundSnapshot, StatusRunner};
