//! Operation tracking for UPDATE and VERIFY rounds.
//!
//! One [`OperationTracker`] exists per [`RoundKey`](derec_types::RoundKey).
//! It owns the per-helper outcome table of its round, re-runs the quorum
//! policy on every accepted outcome and decides when the round completes:
//!
//! - `*_PROGRESS` for every accepted outcome that triggers nothing else
//! - `*_AVAILABLE` when the threshold is reached
//! - `*_FAILED` as soon as the threshold is proven unreachable
//! - `*_COMPLETE` exactly once, when no helper is pending or the round times out

mod config;
mod error;
mod tracker;

pub use config::TrackerConfig;
pub use error::TrackerError;
pub use tracker::{OperationTracker, TrackerPhase};
