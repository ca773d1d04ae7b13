//! Threshold quorum policy.
//!
//! A round is AVAILABLE once `threshold` helpers acknowledged, UNAVAILABLE
//! once the acknowledged helpers plus the still-pending ones cannot reach the
//! threshold, and IN_PROGRESS otherwise. The verdict depends only on the
//! outcome counts and the threshold, never on wall-clock time.
//!
//! [`QuorumCounter`] keeps running counts so each new outcome is evaluated in
//! O(1) instead of rescanning the outcome table.

mod counter;

pub use counter::{OutcomeCounts, QuorumCounter};

use derec_types::{OperationOutcome, Verdict};
use thiserror::Error;

/// Errors from quorum bookkeeping.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuorumError {
    /// A threshold of zero would make every round trivially available.
    #[error("Quorum threshold must be at least 1")]
    ZeroThreshold,

    /// `Pending` was passed where a resolution was expected.
    #[error("Pending is not a resolution")]
    PendingIsNotAResolution,

    /// Every slot is already resolved.
    #[error("No pending helper left to resolve")]
    NothingPending,
}

/// Evaluate the verdict for the given counts.
pub fn evaluate(acknowledged: usize, pending: usize, threshold: usize) -> Verdict {
    if acknowledged >= threshold {
        Verdict::Available
    } else if pending + acknowledged < threshold {
        Verdict::Unavailable
    } else {
        Verdict::InProgress
    }
}

/// Evaluate the verdict by scanning a full set of outcomes.
pub fn evaluate_outcomes<I>(outcomes: I, threshold: usize) -> Verdict
where
    I: IntoIterator<Item = OperationOutcome>,
{
    let (acknowledged, pending) =
        outcomes
            .into_iter()
            .fold((0, 0), |(acknowledged, pending), outcome| match outcome {
                OperationOutcome::Acknowledged => (acknowledged + 1, pending),
                OperationOutcome::Pending => (acknowledged, pending + 1),
                OperationOutcome::Rejected | OperationOutcome::TimedOut => {
                    (acknowledged, pending)
                }
            });
    evaluate(acknowledged, pending, threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_evaluate_boundaries() {
        // threshold 3 of 4
        assert_eq!(evaluate(0, 4, 3), Verdict::InProgress);
        assert_eq!(evaluate(2, 2, 3), Verdict::InProgress);
        assert_eq!(evaluate(3, 1, 3), Verdict::Available);
        assert_eq!(evaluate(3, 0, 3), Verdict::Available);
        assert_eq!(evaluate(1, 1, 3), Verdict::Unavailable);
        assert_eq!(evaluate(2, 1, 3), Verdict::InProgress);
    }

    #[test]
    fn test_threshold_above_helper_count() {
        assert_eq!(evaluate(0, 2, 3), Verdict::Unavailable);
    }

    #[test]
    fn test_evaluate_outcomes_scan() {
        use OperationOutcome::*;
        assert_eq!(
            evaluate_outcomes([Acknowledged, Acknowledged, Pending, TimedOut], 3),
            Verdict::InProgress
        );
        assert_eq!(
            evaluate_outcomes([Acknowledged, Rejected, Pending, TimedOut], 3),
            Verdict::Unavailable
        );
        assert_eq!(
            evaluate_outcomes([Acknowledged, Acknowledged, Acknowledged, Rejected], 3),
            Verdict::Available
        );
    }

    fn resolution() -> impl Strategy<Value = OperationOutcome> {
        prop_oneof![
            Just(OperationOutcome::Acknowledged),
            Just(OperationOutcome::Rejected),
            Just(OperationOutcome::TimedOut),
        ]
    }

    proptest! {
        #[test]
        fn prop_counter_matches_full_scan(
            resolutions in proptest::collection::vec(resolution(), 1..24),
            threshold in 1usize..24,
        ) {
            let total = resolutions.len();
            let mut counter = QuorumCounter::new(total, threshold).unwrap();
            let mut outcomes = vec![OperationOutcome::Pending; total];

            for (i, outcome) in resolutions.iter().enumerate() {
                counter.resolve(*outcome).unwrap();
                outcomes[i] = *outcome;
                prop_assert_eq!(
                    counter.verdict(),
                    evaluate_outcomes(outcomes.iter().copied(), threshold)
                );
            }
        }

        #[test]
        fn prop_verdict_never_leaves_decided_state(
            resolutions in proptest::collection::vec(resolution(), 1..24),
            threshold in 1usize..24,
        ) {
            let mut counter = QuorumCounter::new(resolutions.len(), threshold).unwrap();
            let mut decided = None;

            for outcome in resolutions {
                counter.resolve(outcome).unwrap();
                let verdict = counter.verdict();
                if let Some(previous) = decided {
                    prop_assert_eq!(verdict, previous);
                } else if verdict.is_decided() {
                    decided = Some(verdict);
                }
            }
            // With nothing pending the verdict is always decided.
            prop_assert!(counter.verdict().is_decided());
        }
    }
}
