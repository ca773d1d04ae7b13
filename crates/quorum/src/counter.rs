//! Incremental quorum counter.

use crate::{evaluate, QuorumError};
use derec_types::{OperationOutcome, Verdict};

/// Snapshot of the outcome counts of one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub pending: usize,
    pub acknowledged: usize,
    pub rejected: usize,
    pub timed_out: usize,
}

impl OutcomeCounts {
    /// Total number of helper slots.
    pub fn total(&self) -> usize {
        self.pending + self.acknowledged + self.rejected + self.timed_out
    }

    /// Number of slots that have been resolved.
    pub fn resolved(&self) -> usize {
        self.total() - self.pending
    }
}

/// Running counters for one round.
///
/// Every slot starts pending. Each [`resolve`](Self::resolve) moves one slot
/// out of pending, so the verdict is recomputed in constant time.
#[derive(Debug, Clone)]
pub struct QuorumCounter {
    counts: OutcomeCounts,
    threshold: usize,
}

impl QuorumCounter {
    /// Create a counter for `total` helpers, all pending.
    pub fn new(total: usize, threshold: usize) -> Result<Self, QuorumError> {
        if threshold == 0 {
            return Err(QuorumError::ZeroThreshold);
        }
        Ok(Self {
            counts: OutcomeCounts {
                pending: total,
                ..OutcomeCounts::default()
            },
            threshold,
        })
    }

    /// Move one pending slot to `outcome`.
    pub fn resolve(&mut self, outcome: OperationOutcome) -> Result<Verdict, QuorumError> {
        if self.counts.pending == 0 {
            return Err(QuorumError::NothingPending);
        }
        match outcome {
            OperationOutcome::Pending => return Err(QuorumError::PendingIsNotAResolution),
            OperationOutcome::Acknowledged => self.counts.acknowledged += 1,
            OperationOutcome::Rejected => self.counts.rejected += 1,
            OperationOutcome::TimedOut => self.counts.timed_out += 1,
        }
        self.counts.pending -= 1;
        Ok(self.verdict())
    }

    /// Current verdict.
    pub fn verdict(&self) -> Verdict {
        evaluate(self.counts.acknowledged, self.counts.pending, self.threshold)
    }

    /// Whether every slot is resolved.
    pub fn is_settled(&self) -> bool {
        self.counts.pending == 0
    }

    pub fn counts(&self) -> OutcomeCounts {
        self.counts
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }
}
