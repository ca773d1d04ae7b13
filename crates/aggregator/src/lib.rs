//! Secret-level availability aggregation.
//!
//! The [`SecretAggregator`] is the only component that emits
//! SECRET_AVAILABLE / SECRET_UNAVAILABLE, and it does so on edges only. It
//! also relays helper pairing transitions (HELPER_READY, HELPER_INACTIVE,
//! HELPER_NOT_PAIRED, HELPER_UNPAIRED) and re-evaluates availability in the
//! same call.

mod aggregator;

pub use aggregator::SecretAggregator;

use derec_types::HelperId;
use thiserror::Error;

/// Errors returned by [`SecretAggregator`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregatorError {
    /// A threshold of zero would make every secret trivially available.
    #[error("Secret threshold must be at least 1")]
    ZeroThreshold,

    /// The helper was unpaired; the relationship cannot be revived.
    #[error("{helper} is unpaired")]
    HelperUnpaired { helper: HelperId },
}
