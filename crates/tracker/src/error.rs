//! Error types for operation tracking.
//!
//! These are contract violations by the caller. Protocol outcomes such as a
//! failed round are reported as notifications instead.

use derec_quorum::QuorumError;
use derec_types::{HelperId, OperationOutcome, RoundKey};
use thiserror::Error;

/// Errors returned by [`OperationTracker`](crate::OperationTracker).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackerError {
    /// The helper already has a resolved outcome in this round.
    #[error("Duplicate outcome for {helper} in {key}: already {existing}")]
    DuplicateOutcome {
        key: RoundKey,
        helper: HelperId,
        existing: OperationOutcome,
    },

    /// The helper does not take part in this round.
    #[error("{helper} is not part of {key}")]
    UnknownHelper { key: RoundKey, helper: HelperId },

    /// The round already emitted its completion.
    #[error("Round {key} is complete")]
    RoundComplete { key: RoundKey },

    /// Outcomes arrived before the round was started.
    #[error("Round {key} has not started")]
    NotStarted { key: RoundKey },

    /// `start` was called twice.
    #[error("Round {key} already started")]
    AlreadyStarted { key: RoundKey },

    /// `Pending` was recorded as an outcome.
    #[error("Pending is not a valid outcome for {helper}")]
    PendingOutcome { helper: HelperId },

    /// Invalid quorum parameters.
    #[error("Quorum error: {0}")]
    Quorum(#[from] QuorumError),
}
