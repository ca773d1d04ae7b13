//! Operation tracker for a single UPDATE or VERIFY round.

use crate::{TrackerConfig, TrackerError};
use derec_core::{Action, Event, TimerId};
use derec_quorum::{OutcomeCounts, QuorumCounter};
use derec_types::{
    HelperId, HelperStatus, OperationOutcome, OperationStage, RoundKey, StatusNotification,
    Verdict, Version,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Lifecycle of a round.
///
/// `PendingRound → InProgress → {Available, Unavailable} → Complete`.
/// Only `Complete` is terminal; an available round keeps accepting outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackerPhase {
    /// Created but not started.
    PendingRound,
    /// Collecting outcomes, threshold neither reached nor ruled out.
    InProgress,
    /// Threshold reached.
    Available,
    /// Threshold can no longer be reached; the round failed.
    Unavailable,
    /// Completion emitted. No further outcomes are accepted.
    Complete,
}

/// Per-helper slot in a round.
#[derive(Debug, Clone)]
struct HelperSlot {
    /// Helper status at the time the round started.
    status: HelperStatus,
    outcome: OperationOutcome,
}

/// Tracks helper outcomes for one round of one operation.
///
/// Synchronous and I/O free. Every mutating call returns the [`Action`]s the
/// runner must perform, in order. The runner serializes calls per tracker so
/// a verdict change and its notifications are observed atomically.
#[derive(Debug)]
pub struct OperationTracker {
    key: RoundKey,
    version: Version,
    slots: BTreeMap<HelperId, HelperSlot>,
    counter: QuorumCounter,
    phase: TrackerPhase,
    /// Whether the round already reported failure (no further progress).
    failed: bool,
    config: TrackerConfig,
}

impl OperationTracker {
    /// Create a tracker for `key` over the given helpers.
    ///
    /// Duplicate helper entries collapse into one slot.
    pub fn new(
        key: RoundKey,
        version: Version,
        helpers: impl IntoIterator<Item = HelperStatus>,
        threshold: usize,
        config: TrackerConfig,
    ) -> Result<Self, TrackerError> {
        let slots: BTreeMap<HelperId, HelperSlot> = helpers
            .into_iter()
            .map(|status| {
                (
                    status.helper,
                    HelperSlot {
                        status,
                        outcome: OperationOutcome::Pending,
                    },
                )
            })
            .collect();
        let counter = QuorumCounter::new(slots.len(), threshold)?;

        Ok(Self {
            key,
            version,
            slots,
            counter,
            phase: TrackerPhase::PendingRound,
            failed: false,
            config,
        })
    }

    pub fn key(&self) -> RoundKey {
        self.key
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    pub fn phase(&self) -> TrackerPhase {
        self.phase
    }

    pub fn verdict(&self) -> Verdict {
        self.counter.verdict()
    }

    pub fn counts(&self) -> OutcomeCounts {
        self.counter.counts()
    }

    pub fn threshold(&self) -> usize {
        self.counter.threshold()
    }

    /// Whether the round emitted its completion.
    pub fn is_terminal(&self) -> bool {
        self.phase == TrackerPhase::Complete
    }

    /// Outcome recorded for a helper, if it takes part in the round.
    pub fn outcome(&self, helper: HelperId) -> Option<OperationOutcome> {
        self.slots.get(&helper).map(|slot| slot.outcome)
    }

    /// Helpers taking part in the round.
    pub fn helpers(&self) -> impl Iterator<Item = HelperId> + '_ {
        self.slots.keys().copied()
    }

    fn timer_id(&self) -> TimerId {
        TimerId::RoundTimeout(self.key)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Public API
    // ═══════════════════════════════════════════════════════════════════════════

    /// Start the round.
    ///
    /// Arms the round timeout and reports the initial verdict. A round whose
    /// threshold is unreachable from the start fails immediately, and a round
    /// without helpers also completes immediately.
    pub fn start(&mut self) -> Result<Vec<Action>, TrackerError> {
        if self.phase != TrackerPhase::PendingRound {
            return Err(TrackerError::AlreadyStarted { key: self.key });
        }
        self.phase = TrackerPhase::InProgress;

        let verdict = self.counter.verdict();
        info!(
            round = %self.key,
            helpers = self.slots.len(),
            threshold = self.counter.threshold(),
            verdict = %verdict,
            "Round started"
        );

        let mut actions = Vec::new();
        if !self.counter.is_settled() {
            actions.push(Action::SetTimer {
                id: self.timer_id(),
                duration: self.config.round_timeout,
            });
        }
        actions.push(self.verdict_event(verdict));
        if verdict == Verdict::Unavailable {
            self.fail(None, &mut actions);
        }
        if self.counter.is_settled() {
            self.complete("no helpers in round", &mut actions);
        }
        Ok(actions)
    }

    /// Record a helper's outcome for this round.
    ///
    /// Outcomes are append-once: a helper that already resolved is rejected
    /// with [`TrackerError::DuplicateOutcome`] and nothing changes.
    pub fn record_outcome(
        &mut self,
        helper: HelperId,
        outcome: OperationOutcome,
    ) -> Result<Vec<Action>, TrackerError> {
        match self.phase {
            TrackerPhase::PendingRound => {
                return Err(TrackerError::NotStarted { key: self.key });
            }
            TrackerPhase::Complete => {
                warn!(round = %self.key, %helper, "Outcome recorded after completion");
                return Err(TrackerError::RoundComplete { key: self.key });
            }
            TrackerPhase::InProgress | TrackerPhase::Available | TrackerPhase::Unavailable => {}
        }

        let slot = self
            .slots
            .get(&helper)
            .ok_or(TrackerError::UnknownHelper {
                key: self.key,
                helper,
            })?;
        if !outcome.is_resolved() {
            return Err(TrackerError::PendingOutcome { helper });
        }
        if slot.outcome.is_resolved() {
            warn!(
                round = %self.key,
                %helper,
                existing = %slot.outcome,
                "Duplicate outcome rejected"
            );
            return Err(TrackerError::DuplicateOutcome {
                key: self.key,
                helper,
                existing: slot.outcome,
            });
        }
        let status = slot.status;

        let before = self.counter.verdict();
        let after = self.counter.resolve(outcome)?;
        if let Some(slot) = self.slots.get_mut(&helper) {
            slot.outcome = outcome;
        }

        let counts = self.counter.counts();
        debug!(
            round = %self.key,
            %helper,
            %outcome,
            acknowledged = counts.acknowledged,
            pending = counts.pending,
            "Outcome recorded"
        );

        let mut actions = Vec::new();
        let mut notified = self.apply_verdict(before, after, Some(status), &mut actions);

        if self.counter.is_settled() {
            actions.push(Action::CancelTimer {
                id: self.timer_id(),
            });
            self.complete("all helpers responded", &mut actions);
            notified = true;
        }

        if !notified && !self.failed {
            actions.push(Action::Notify(
                StatusNotification::operation(
                    self.key.kind,
                    OperationStage::Progress,
                    self.version,
                    format!(
                        "{} {} by {}: {}/{} acknowledged, threshold {}",
                        self.key.kind,
                        outcome,
                        helper,
                        counts.acknowledged,
                        counts.total(),
                        self.counter.threshold()
                    ),
                )
                .with_helper(status),
            ));
        }

        Ok(actions)
    }

    /// Handle expiry of the round timeout.
    ///
    /// Every helper still pending is recorded as timed out, then the round
    /// completes. Ignored if the round already completed.
    pub fn on_round_timeout(&mut self) -> Vec<Action> {
        match self.phase {
            TrackerPhase::PendingRound | TrackerPhase::Complete => {
                debug!(round = %self.key, phase = ?self.phase, "Ignoring round timeout");
                return vec![];
            }
            TrackerPhase::InProgress | TrackerPhase::Available | TrackerPhase::Unavailable => {}
        }

        let before = self.counter.verdict();
        let mut after = before;
        let mut expired = 0usize;
        for slot in self.slots.values_mut() {
            if slot.outcome.is_resolved() {
                continue;
            }
            slot.outcome = OperationOutcome::TimedOut;
            after = match self.counter.resolve(OperationOutcome::TimedOut) {
                Ok(verdict) => verdict,
                Err(e) => {
                    warn!(round = %self.key, error = %e, "Counter out of sync with slots");
                    break;
                }
            };
            expired += 1;
        }

        info!(round = %self.key, expired, "Round timed out");

        let mut actions = Vec::new();
        self.apply_verdict(before, after, None, &mut actions);
        self.complete("round timed out", &mut actions);
        actions
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Transitions
    // ═══════════════════════════════════════════════════════════════════════════

    /// Emit the consequences of a verdict change. Returns whether a
    /// notification was emitted.
    fn apply_verdict(
        &mut self,
        before: Verdict,
        after: Verdict,
        trigger: Option<HelperStatus>,
        actions: &mut Vec<Action>,
    ) -> bool {
        if before == after {
            return false;
        }

        let notified = match after {
            Verdict::Available => {
                self.phase = TrackerPhase::Available;
                let counts = self.counter.counts();
                info!(
                    round = %self.key,
                    acknowledged = counts.acknowledged,
                    threshold = self.counter.threshold(),
                    "Round reached quorum"
                );
                let mut notification = StatusNotification::operation(
                    self.key.kind,
                    OperationStage::Available,
                    self.version,
                    format!(
                        "{} acknowledged by {} of {} helpers, threshold {} reached",
                        self.key.kind,
                        counts.acknowledged,
                        counts.total(),
                        self.counter.threshold()
                    ),
                );
                if let Some(status) = trigger {
                    notification = notification.with_helper(status);
                }
                actions.push(Action::Notify(notification));
                true
            }
            Verdict::Unavailable => {
                self.fail(trigger, actions);
                true
            }
            Verdict::InProgress => false,
        };
        // Secret-level consequences follow the round notification.
        actions.push(self.verdict_event(after));
        notified
    }

    fn fail(&mut self, trigger: Option<HelperStatus>, actions: &mut Vec<Action>) {
        self.phase = TrackerPhase::Unavailable;
        self.failed = true;
        let counts = self.counter.counts();
        info!(
            round = %self.key,
            acknowledged = counts.acknowledged,
            pending = counts.pending,
            threshold = self.counter.threshold(),
            "Round threshold unreachable"
        );
        let mut notification = StatusNotification::operation(
            self.key.kind,
            OperationStage::Failed,
            self.version,
            format!(
                "{} failed: {} acknowledged and {} pending cannot reach threshold {}",
                self.key.kind,
                counts.acknowledged,
                counts.pending,
                self.counter.threshold()
            ),
        );
        if let Some(status) = trigger {
            notification = notification.with_helper(status);
        }
        actions.push(Action::Notify(notification));
    }

    fn complete(&mut self, reason: &str, actions: &mut Vec<Action>) {
        self.phase = TrackerPhase::Complete;
        let counts = self.counter.counts();
        info!(round = %self.key, reason, verdict = %self.counter.verdict(), "Round complete");
        actions.push(Action::Notify(StatusNotification::operation(
            self.key.kind,
            OperationStage::Complete,
            self.version,
            format!(
                "{} complete ({}): {} acknowledged, {} rejected, {} timed out",
                self.key.kind, reason, counts.acknowledged, counts.rejected, counts.timed_out
            ),
        )));
    }

    fn verdict_event(&self, verdict: Verdict) -> Action {
        Action::EnqueueInternal {
            event: Event::RoundVerdictChanged {
                key: self.key,
                version: self.version,
                verdict,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use derec_test_helpers::{helpers, notification_kinds, round_key, test_version};
    use derec_types::{NotificationType, OperationKind};
    use proptest::prelude::*;
    use std::time::Duration;
    use tracing_test::traced_test;

    use NotificationType::*;
    use OperationOutcome::*;

    fn make_tracker(kind: OperationKind, n: u64, threshold: usize) -> OperationTracker {
        let version = test_version(1, 1);
        let mut tracker = OperationTracker::new(
            round_key(&version, kind),
            version,
            helpers(n),
            threshold,
            TrackerConfig::with_round_timeout(Duration::from_secs(30)),
        )
        .unwrap();
        tracker.start().unwrap();
        tracker
    }

    #[traced_test]
    #[test]
    fn test_start_arms_timer_and_reports_verdict() {
        let version = test_version(1, 1);
        let key = round_key(&version, OperationKind::Update);
        let mut tracker =
            OperationTracker::new(key, version, helpers(4), 3, TrackerConfig::default()).unwrap();
        assert_eq!(tracker.phase(), TrackerPhase::PendingRound);

        let actions = tracker.start().unwrap();
        assert_eq!(
            actions[0],
            Action::SetTimer {
                id: TimerId::RoundTimeout(key),
                duration: Duration::from_secs(60),
            }
        );
        assert_eq!(
            actions[1],
            Action::EnqueueInternal {
                event: Event::RoundVerdictChanged {
                    key,
                    version,
                    verdict: Verdict::InProgress,
                },
            }
        );
        assert!(notification_kinds(&actions).is_empty());
        assert_eq!(tracker.phase(), TrackerPhase::InProgress);

        assert_eq!(
            tracker.start().unwrap_err(),
            TrackerError::AlreadyStarted { key }
        );
    }

    #[traced_test]
    #[test]
    fn test_outcome_before_start_rejected() {
        let version = test_version(1, 1);
        let key = round_key(&version, OperationKind::Update);
        let mut tracker =
            OperationTracker::new(key, version, helpers(2), 1, TrackerConfig::default()).unwrap();
        assert_eq!(
            tracker.record_outcome(HelperId(1), Acknowledged),
            Err(TrackerError::NotStarted { key })
        );
    }

    #[traced_test]
    #[test]
    fn test_update_scenario_reaches_quorum_then_completes() {
        let mut tracker = make_tracker(OperationKind::Update, 4, 3);

        let a1 = tracker.record_outcome(HelperId(1), Acknowledged).unwrap();
        let a2 = tracker.record_outcome(HelperId(2), Acknowledged).unwrap();
        assert_eq!(notification_kinds(&a1), vec![UpdateProgress]);
        assert_eq!(notification_kinds(&a2), vec![UpdateProgress]);
        assert_eq!(tracker.verdict(), Verdict::InProgress);

        let a3 = tracker.record_outcome(HelperId(3), Acknowledged).unwrap();
        assert_eq!(notification_kinds(&a3), vec![UpdateAvailable]);
        assert_eq!(tracker.verdict(), Verdict::Available);
        assert_eq!(tracker.phase(), TrackerPhase::Available);

        let a4 = tracker.record_outcome(HelperId(4), TimedOut).unwrap();
        assert_eq!(notification_kinds(&a4), vec![UpdateComplete]);
        assert!(a4.iter().any(|a| matches!(a, Action::CancelTimer { .. })));
        assert!(tracker.is_terminal());
        assert_eq!(tracker.verdict(), Verdict::Available);
    }

    #[traced_test]
    #[test]
    fn test_update_scenario_unreachable_threshold_fails() {
        let mut tracker = make_tracker(OperationKind::Update, 3, 3);

        let a1 = tracker.record_outcome(HelperId(1), Rejected).unwrap();
        assert_eq!(notification_kinds(&a1), vec![UpdateFailed]);
        assert_eq!(tracker.verdict(), Verdict::Unavailable);

        // Failure is terminal for progress: later outcomes are silent
        let a2 = tracker.record_outcome(HelperId(2), TimedOut).unwrap();
        assert!(notification_kinds(&a2).is_empty());

        let a3 = tracker.record_outcome(HelperId(3), Acknowledged).unwrap();
        assert_eq!(notification_kinds(&a3), vec![UpdateComplete]);
        assert!(tracker.is_terminal());
    }

    #[traced_test]
    #[test]
    fn test_failed_round_completes_on_timeout() {
        let mut tracker = make_tracker(OperationKind::Update, 3, 3);
        tracker.record_outcome(HelperId(1), Rejected).unwrap();
        tracker.record_outcome(HelperId(2), TimedOut).unwrap();

        let actions = tracker.on_round_timeout();
        assert_eq!(notification_kinds(&actions), vec![UpdateComplete]);
        assert_eq!(tracker.outcome(HelperId(3)), Some(TimedOut));
        assert!(tracker.is_terminal());

        // Timer firing twice does nothing
        assert!(tracker.on_round_timeout().is_empty());
    }

    #[traced_test]
    #[test]
    fn test_timeout_makes_threshold_unreachable() {
        let mut tracker = make_tracker(OperationKind::Verify, 4, 3);
        tracker.record_outcome(HelperId(1), Acknowledged).unwrap();
        tracker.record_outcome(HelperId(2), Acknowledged).unwrap();

        let actions = tracker.on_round_timeout();
        assert_eq!(
            notification_kinds(&actions),
            vec![VerifyFailed, VerifyComplete]
        );
        assert_eq!(tracker.counts().timed_out, 2);
        assert_eq!(tracker.verdict(), Verdict::Unavailable);
    }

    #[traced_test]
    #[test]
    fn test_duplicate_outcome_leaves_state_unchanged() {
        let mut tracker = make_tracker(OperationKind::Verify, 3, 2);
        tracker.record_outcome(HelperId(1), Rejected).unwrap();
        let counts = tracker.counts();

        let err = tracker.record_outcome(HelperId(1), Acknowledged).unwrap_err();
        assert_eq!(
            err,
            TrackerError::DuplicateOutcome {
                key: tracker.key(),
                helper: HelperId(1),
                existing: Rejected,
            }
        );
        assert_eq!(tracker.counts(), counts);
        assert_eq!(tracker.outcome(HelperId(1)), Some(Rejected));
        assert_eq!(tracker.verdict(), Verdict::InProgress);
    }

    #[traced_test]
    #[test]
    fn test_contract_violations() {
        let mut tracker = make_tracker(OperationKind::Update, 2, 1);
        let key = tracker.key();

        assert_eq!(
            tracker.record_outcome(HelperId(99), Acknowledged),
            Err(TrackerError::UnknownHelper {
                key,
                helper: HelperId(99)
            })
        );
        assert_eq!(
            tracker.record_outcome(HelperId(1), Pending),
            Err(TrackerError::PendingOutcome {
                helper: HelperId(1)
            })
        );

        tracker.record_outcome(HelperId(1), Acknowledged).unwrap();
        tracker.record_outcome(HelperId(2), Acknowledged).unwrap();
        assert_eq!(
            tracker.record_outcome(HelperId(2), Acknowledged),
            Err(TrackerError::RoundComplete { key })
        );
    }

    #[traced_test]
    #[test]
    fn test_unreachable_from_start() {
        let version = test_version(1, 1);
        let mut tracker = OperationTracker::new(
            round_key(&version, OperationKind::Update),
            version,
            helpers(2),
            3,
            TrackerConfig::default(),
        )
        .unwrap();

        let actions = tracker.start().unwrap();
        assert_eq!(notification_kinds(&actions), vec![UpdateFailed]);
        assert_eq!(tracker.phase(), TrackerPhase::Unavailable);

        let actions = tracker.record_outcome(HelperId(1), Acknowledged).unwrap();
        assert!(notification_kinds(&actions).is_empty());
    }

    #[traced_test]
    #[test]
    fn test_empty_round_fails_and_completes() {
        let version = test_version(1, 1);
        let mut tracker = OperationTracker::new(
            round_key(&version, OperationKind::Verify),
            version,
            Vec::new(),
            1,
            TrackerConfig::default(),
        )
        .unwrap();

        let actions = tracker.start().unwrap();
        assert!(!actions.iter().any(Action::is_timer));
        assert_eq!(
            notification_kinds(&actions),
            vec![VerifyFailed, VerifyComplete]
        );
        assert!(tracker.is_terminal());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let version = test_version(1, 1);
        let result = OperationTracker::new(
            round_key(&version, OperationKind::Update),
            version,
            helpers(2),
            0,
            TrackerConfig::default(),
        );
        assert!(matches!(result, Err(TrackerError::Quorum(_))));
    }

    fn resolution() -> impl Strategy<Value = OperationOutcome> {
        prop_oneof![Just(Acknowledged), Just(Rejected), Just(TimedOut)]
    }

    /// Outcomes for every helper, delivered in a random order.
    fn round_inputs() -> impl Strategy<Value = (usize, Vec<(u64, OperationOutcome)>)> {
        (1u64..10)
            .prop_flat_map(|n| {
                (
                    1..=(n as usize + 1),
                    proptest::collection::vec(resolution(), n as usize),
                )
            })
            .prop_flat_map(|(threshold, outcomes)| {
                let indexed: Vec<(u64, OperationOutcome)> = outcomes
                    .into_iter()
                    .enumerate()
                    .map(|(i, o)| (i as u64 + 1, o))
                    .collect();
                (Just(threshold), Just(indexed).prop_shuffle())
            })
    }

    proptest! {
        #[test]
        fn prop_round_notifications_respect_invariants((threshold, inputs) in round_inputs()) {
            let mut tracker = make_tracker(OperationKind::Update, inputs.len() as u64, threshold);
            let mut kinds = Vec::new();
            let mut acknowledged = 0usize;

            for (helper, outcome) in &inputs {
                let actions = tracker.record_outcome(HelperId(*helper), *outcome).unwrap();
                kinds.extend(notification_kinds(&actions));
                if *outcome == Acknowledged {
                    acknowledged += 1;
                }
                // Once the threshold is met the verdict stays available.
                if acknowledged >= threshold {
                    prop_assert_eq!(tracker.verdict(), Verdict::Available);
                }
            }

            let count = |k: NotificationType| kinds.iter().filter(|x| **x == k).count();
            prop_assert_eq!(count(UpdateComplete), 1);
            prop_assert_eq!(kinds.last(), Some(&UpdateComplete));
            prop_assert!(count(UpdateAvailable) + count(UpdateFailed) <= 1);

            // Nothing but completion follows a failure.
            if let Some(pos) = kinds.iter().position(|k| *k == UpdateFailed) {
                prop_assert_eq!(&kinds[pos + 1..], &[UpdateComplete][..]);
            }
            prop_assert!(tracker.is_terminal());
        }
    }
}
