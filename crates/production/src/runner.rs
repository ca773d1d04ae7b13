//! Concurrent runner for the status state machines.
//!
//! Owns the tracker arena, the per-secret aggregators and the round timers,
//! and executes the [`Action`]s the state machines return.
//!
//! # Locking
//!
//! - Every call that touches a secret runs under that secret's delivery
//!   lock. State changes and the publication of the notifications they
//!   cause are therefore atomic to observers and ordered per secret.
//! - The delivery lock is reentrant. Tracker and aggregator mutexes are
//!   released before anything is published, so an observer may call back
//!   into the runner from the delivering thread.
//! - Lock order is delivery, then tracker, then aggregator.
//! - DashMap references are cloned out and dropped before any other lock is
//!   taken.

use crate::{RunnerConfig, RunnerError};
use dashmap::DashMap;
use derec_aggregator::SecretAggregator;
use derec_core::{Action, Event, TimerId};
use derec_dispatcher::NotificationDispatcher;
use derec_quorum::OutcomeCounts;
use derec_tracker::{OperationTracker, TrackerConfig, TrackerPhase};
use derec_types::{
    HelperId, HelperStatus, OperationKind, OperationOutcome, RoundKey, RoundNumber, SecretId,
    StatusNotification, Verdict, Version, VersionNumber,
};
use parking_lot::{Mutex, ReentrantMutex};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Point-in-time view of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundSnapshot {
    pub phase: TrackerPhase,
    pub verdict: Verdict,
    pub counts: OutcomeCounts,
}

/// Registry record of a protected secret.
struct SecretEntry {
    threshold: usize,
    aggregator: Mutex<SecretAggregator>,
    /// Latest round per (version, operation).
    latest_rounds: Mutex<HashMap<(VersionNumber, OperationKind), RoundKey>>,
    /// Serializes state changes and delivery for this secret.
    delivery: ReentrantMutex<()>,
    /// Set under `delivery` once the secret is retired.
    retired: AtomicBool,
}

struct Inner {
    tracker_config: TrackerConfig,
    dispatcher: Arc<NotificationDispatcher>,
    runtime: Handle,
    secrets: DashMap<SecretId, Arc<SecretEntry>>,
    trackers: DashMap<RoundKey, Arc<Mutex<OperationTracker>>>,
    timers: DashMap<RoundKey, JoinHandle<()>>,
}

/// Entry point for the transport, the pairing manager and the application.
///
/// Cheap to clone; clones share state.
///
/// Observers are called on the thread that changed the state, with the
/// secret's delivery lock held. Calling back into the runner from inside
/// `on_notification` is fine. Blocking on another thread that calls the
/// runner for the same secret is not: such observers should subscribe a
/// [`ChannelObserver`](derec_dispatcher::ChannelObserver) and do their work
/// on the receiving side.
#[derive(Clone)]
pub struct StatusRunner {
    inner: Arc<Inner>,
}

impl StatusRunner {
    /// Create a runner publishing to `dispatcher`.
    ///
    /// Must be called from within a tokio runtime; round timers are spawned
    /// on it.
    pub fn new(
        config: &RunnerConfig,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Result<Self, RunnerError> {
        let runtime = Handle::try_current().map_err(|_| RunnerError::NoRuntime)?;
        Ok(Self {
            inner: Arc::new(Inner {
                tracker_config: config.tracker_config(),
                dispatcher,
                runtime,
                secrets: DashMap::new(),
                trackers: DashMap::new(),
                timers: DashMap::new(),
            }),
        })
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.inner.dispatcher
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Secrets
    // ═══════════════════════════════════════════════════════════════════════════

    /// Start tracking a secret with its initial helper statuses.
    pub fn register_secret(
        &self,
        secret: SecretId,
        threshold: usize,
        helpers: impl IntoIterator<Item = HelperStatus>,
    ) -> Result<(), RunnerError> {
        let aggregator = SecretAggregator::new(secret, threshold, helpers)?;
        let entry = Arc::new(SecretEntry {
            threshold,
            aggregator: Mutex::new(aggregator),
            latest_rounds: Mutex::new(HashMap::new()),
            delivery: ReentrantMutex::new(()),
            retired: AtomicBool::new(false),
        });

        match self.inner.secrets.entry(secret) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(RunnerError::SecretAlreadyRegistered(secret))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(entry);
                info!(%secret, threshold, "Secret registered");
                Ok(())
            }
        }
    }

    /// Stop tracking a secret. Drops its rounds and cancels their timers.
    ///
    /// Calls racing with this one either finish before it or fail with
    /// [`RunnerError::UnknownSecret`]; none leaves a round behind.
    pub fn retire_secret(&self, secret: SecretId) -> Result<(), RunnerError> {
        let (_, entry) = self
            .inner
            .secrets
            .remove(&secret)
            .ok_or(RunnerError::UnknownSecret(secret))?;

        let _delivery = entry.delivery.lock();
        entry.retired.store(true, Ordering::Release);

        self.inner.trackers.retain(|key, _| key.secret != secret);
        self.inner.timers.retain(|key, handle| {
            if key.secret == secret {
                handle.abort();
                false
            } else {
                true
            }
        });
        info!(%secret, "Secret retired");
        Ok(())
    }

    /// Current availability of a secret.
    pub fn secret_availability(&self, secret: SecretId) -> Option<Verdict> {
        let entry = self.secret_entry(secret).ok()?;
        let availability = entry.aggregator.lock().availability();
        Some(availability)
    }

    /// Apply a helper pairing transition reported by the pairing manager.
    pub fn helper_status_changed(
        &self,
        secret: SecretId,
        status: HelperStatus,
    ) -> Result<(), RunnerError> {
        self.deliver(secret, |entry, outbox| {
            let notifications = entry.aggregator.lock().on_helper_status(status)?;
            outbox.extend(notifications);
            Ok(())
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Rounds
    // ═══════════════════════════════════════════════════════════════════════════

    /// Open a new round of `kind` on `version` over the secret's paired
    /// helpers. Rounds after the first are retries with the next number.
    pub fn start_round(
        &self,
        version: Version,
        kind: OperationKind,
    ) -> Result<RoundKey, RunnerError> {
        self.deliver(version.secret, |entry, outbox| {
            let key = *entry
                .latest_rounds
                .lock()
                .entry((version.number, kind))
                .and_modify(|latest| *latest = latest.retry())
                .or_insert_with(|| {
                    RoundKey::new(version.secret, version.number, kind, RoundNumber::FIRST)
                });

            let helpers: Vec<HelperStatus> =
                entry.aggregator.lock().paired_helpers().copied().collect();
            let tracker = OperationTracker::new(
                key,
                version,
                helpers,
                entry.threshold,
                self.inner.tracker_config.clone(),
            )?;

            let tracker = Arc::new(Mutex::new(tracker));
            self.inner.trackers.insert(key, tracker.clone());

            let actions = tracker.lock().start()?;
            self.execute(entry, actions, outbox);
            Ok(key)
        })
    }

    /// Record a helper's outcome for a round.
    ///
    /// Contract violations (duplicate outcome, unknown helper, completed
    /// round) are returned to the caller and leave state unchanged.
    pub fn record_outcome(
        &self,
        key: RoundKey,
        helper: HelperId,
        outcome: OperationOutcome,
    ) -> Result<(), RunnerError> {
        self.deliver(key.secret, |entry, outbox| {
            let tracker = self.tracker(key)?;
            let actions = tracker.lock().record_outcome(helper, outcome)?;
            self.execute(entry, actions, outbox);
            Ok(())
        })
    }

    /// Snapshot of a round's state.
    pub fn tracker_snapshot(&self, key: RoundKey) -> Option<RoundSnapshot> {
        let tracker = self.tracker(key).ok()?;
        let tracker = tracker.lock();
        Some(RoundSnapshot {
            phase: tracker.phase(),
            verdict: tracker.verdict(),
            counts: tracker.counts(),
        })
    }

    /// Drop completed rounds from the arena. Returns how many were removed.
    pub fn prune_completed(&self) -> usize {
        let before = self.inner.trackers.len();
        self.inner
            .trackers
            .retain(|_, tracker| !tracker.lock().is_terminal());
        let pruned = before.saturating_sub(self.inner.trackers.len());
        debug!(pruned, "Pruned completed rounds");
        pruned
    }

    /// Number of rounds in the arena.
    pub fn round_count(&self) -> usize {
        self.inner.trackers.len()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Action execution
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run `f` under the secret's delivery lock, then publish what it
    /// collected. `f` must release its tracker and aggregator guards before
    /// returning.
    fn deliver<T>(
        &self,
        secret: SecretId,
        f: impl FnOnce(&SecretEntry, &mut Vec<StatusNotification>) -> Result<T, RunnerError>,
    ) -> Result<T, RunnerError> {
        let entry = self.secret_entry(secret)?;
        let _delivery = entry.delivery.lock();
        if entry.retired.load(Ordering::Acquire) {
            return Err(RunnerError::UnknownSecret(secret));
        }

        let mut outbox = Vec::new();
        let result = f(&*entry, &mut outbox);
        for notification in &outbox {
            self.inner.dispatcher.publish(notification);
        }
        result
    }

    fn execute(
        &self,
        entry: &SecretEntry,
        actions: Vec<Action>,
        outbox: &mut Vec<StatusNotification>,
    ) {
        for action in actions {
            debug!(action = action.type_name(), "Executing action");
            match action {
                Action::Notify(notification) => outbox.push(notification),
                Action::SetTimer {
                    id: TimerId::RoundTimeout(key),
                    duration,
                } => self.arm_round_timer(key, duration),
                Action::CancelTimer {
                    id: TimerId::RoundTimeout(key),
                } => {
                    if let Some((_, handle)) = self.inner.timers.remove(&key) {
                        handle.abort();
                        debug!(round = %key, "Round timer cancelled");
                    }
                }
                Action::EnqueueInternal { event } => self.handle_event(entry, event, outbox),
            }
        }
    }

    fn handle_event(
        &self,
        entry: &SecretEntry,
        event: Event,
        outbox: &mut Vec<StatusNotification>,
    ) {
        debug!(event = event.type_name(), "Handling internal event");
        match event {
            Event::RoundVerdictChanged {
                version, verdict, ..
            } => {
                let notifications = entry.aggregator.lock().on_round_verdict(version, verdict);
                outbox.extend(notifications);
            }
            Event::RoundTimeout { key } => {
                // The timer has fired; forget its handle without aborting ourselves.
                self.inner.timers.remove(&key);

                let Ok(tracker) = self.tracker(key) else {
                    debug!(round = %key, "Timeout for pruned round ignored");
                    return;
                };
                let actions = tracker.lock().on_round_timeout();
                self.execute(entry, actions, outbox);
            }
        }
    }

    fn arm_round_timer(&self, key: RoundKey, duration: Duration) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let handle = self.inner.runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if let Some(inner) = weak.upgrade() {
                StatusRunner { inner }.fire_round_timeout(key);
            }
        });
        if let Some(previous) = self.inner.timers.insert(key, handle) {
            previous.abort();
        }
        debug!(round = %key, ?duration, "Round timer armed");
    }

    fn fire_round_timeout(&self, key: RoundKey) {
        let fired = self.deliver(key.secret, |entry, outbox| {
            self.handle_event(entry, Event::RoundTimeout { key }, outbox);
            Ok(())
        });
        if let Err(e) = fired {
            warn!(round = %key, error = %e, "Round timeout dropped");
        }
    }

    fn secret_entry(&self, secret: SecretId) -> Result<Arc<SecretEntry>, RunnerError> {
        self.inner
            .secrets
            .get(&secret)
            .map(|entry| entry.value().clone())
            .ok_or(RunnerError::UnknownSecret(secret))
    }

    fn tracker(&self, key: RoundKey) -> Result<Arc<Mutex<OperationTracker>>, RunnerError> {
        self.inner
            .trackers
            .get(&key)
            .map(|tracker| tracker.value().clone())
            .ok_or(RunnerError::UnknownRound(key))
    }
}
