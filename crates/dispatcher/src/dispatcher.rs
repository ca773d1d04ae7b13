//! Notification fan-out.

use crate::{ChannelObserver, Observer};
use derec_types::StatusNotification;
use parking_lot::RwLock;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Handle returned by [`NotificationDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Result of delivering one notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Observers that accepted the notification.
    pub delivered: usize,
    /// Observers that returned an error or panicked.
    pub failed: usize,
}

#[derive(Clone)]
struct Registration {
    id: SubscriptionId,
    observer: Arc<dyn Observer>,
}

/// Registry of observers and the single fan-out point for notifications.
///
/// Delivery is synchronous and follows registration order. A failing
/// observer never prevents delivery to the ones registered after it.
pub struct NotificationDispatcher {
    observers: RwLock<Vec<Registration>>,
    next_id: AtomicU64,
    published: AtomicU64,
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("observers", &self.observer_count())
            .field("published", &self.published())
            .finish()
    }
}

impl NotificationDispatcher {
    /// Create a dispatcher with no observers.
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(0),
            published: AtomicU64::new(0),
        }
    }

    /// Register an observer.
    ///
    /// The observer receives every notification published after this call
    /// returns, and none published before.
    pub fn subscribe(&self, observer: Arc<dyn Observer>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push(Registration { id, observer });
        debug!(subscription = %id, "Observer subscribed");
        id
    }

    /// Register a [`ChannelObserver`] and return its receiving end.
    pub fn subscribe_channel(
        &self,
    ) -> (SubscriptionId, mpsc::UnboundedReceiver<StatusNotification>) {
        let (observer, receiver) = ChannelObserver::new();
        (self.subscribe(Arc::new(observer)), receiver)
    }

    /// Remove an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|registration| registration.id != id);
        let removed = observers.len() != before;
        if removed {
            debug!(subscription = %id, "Observer unsubscribed");
        }
        removed
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.read().len()
    }

    /// Total notifications published.
    pub fn published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// Deliver a notification to every registered observer, in order.
    ///
    /// Observer errors and panics are logged and counted, then delivery
    /// continues with the next observer.
    pub fn publish(&self, notification: &StatusNotification) -> DeliveryReport {
        // Snapshot so observers may (un)subscribe from inside a callback.
        let observers = self.observers.read().clone();
        self.published.fetch_add(1, Ordering::Relaxed);

        let mut report = DeliveryReport::default();
        for registration in &observers {
            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                registration.observer.on_notification(notification)
            }));
            match result {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!(
                        subscription = %registration.id,
                        kind = %notification.kind(),
                        error = %e,
                        "Observer failed to handle notification"
                    );
                    report.failed += 1;
                }
                Err(_) => {
                    warn!(
                        subscription = %registration.id,
                        kind = %notification.kind(),
                        "Observer panicked while handling notification"
                    );
                    report.failed += 1;
                }
            }
        }

        debug!(
            kind = %notification.kind(),
            secret = %notification.secret(),
            delivered = report.delivered,
            failed = report.failed,
            "Notification published"
        );
        report
    }
}
