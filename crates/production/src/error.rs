//! Runner error types.

use derec_aggregator::AggregatorError;
use derec_tracker::TrackerError;
use derec_types::{RoundKey, SecretId};
use thiserror::Error;

/// Errors returned to the transport and pairing manager.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("{0} is not registered")]
    UnknownSecret(SecretId),

    #[error("{0} is already registered")]
    SecretAlreadyRegistered(SecretId),

    #[error("No tracker for round {0}")]
    UnknownRound(RoundKey),

    #[error("Runner must be created inside a tokio runtime")]
    NoRuntime,

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Aggregator(#[from] AggregatorError),
}
