//! Configuration for operation rounds.

use std::time::Duration;

/// Configuration for an operation round.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// How long a round may wait for helpers before it completes anyway.
    ///
    /// Helpers still pending when this elapses are recorded as timed out.
    pub round_timeout: Duration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            round_timeout: Duration::from_secs(60),
        }
    }
}

impl TrackerConfig {
    /// Create a config with a custom round timeout.
    pub fn with_round_timeout(round_timeout: Duration) -> Self {
        Self { round_timeout }
    }
}
