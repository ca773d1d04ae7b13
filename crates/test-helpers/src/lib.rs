//! Test fixtures shared across the workspace.
//!
//! Provides helper sets, version and round fixtures, and an observer that
//! records everything it is sent.

use derec_core::Action;
use derec_dispatcher::{Observer, ObserverError};
use derec_types::{
    HelperId, HelperStatus, NotificationType, OperationKind, RoundKey, RoundNumber, SecretId,
    StatusNotification, Version, VersionNumber,
};
use parking_lot::Mutex;
use std::time::Duration;

/// `n` paired-active helpers with ids `1..=n`.
pub fn helpers(n: u64) -> Vec<HelperStatus> {
    (1..=n)
        .map(|i| HelperStatus::active(HelperId(i), Duration::from_secs(i)))
        .collect()
}

/// A version of `secret` created at `number` seconds.
pub fn test_version(secret: u64, number: u64) -> Version {
    Version::new(
        SecretId(secret),
        VersionNumber(number),
        Duration::from_secs(number),
    )
}

/// First round of `kind` on `version`.
pub fn round_key(version: &Version, kind: OperationKind) -> RoundKey {
    RoundKey::new(version.secret, version.number, kind, RoundNumber::FIRST)
}

/// Kinds of the notifications carried by `actions`, in order.
pub fn notification_kinds(actions: &[Action]) -> Vec<NotificationType> {
    actions
        .iter()
        .filter_map(Action::as_notification)
        .map(StatusNotification::kind)
        .collect()
}

/// Observer that keeps every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    received: Mutex<Vec<StatusNotification>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far.
    pub fn received(&self) -> Vec<StatusNotification> {
        self.received.lock().clone()
    }

    /// Kinds received so far, in delivery order.
    pub fn kinds(&self) -> Vec<NotificationType> {
        self.received.lock().iter().map(|n| n.kind()).collect()
    }

    /// Number of received notifications of `kind`.
    pub fn count(&self, kind: NotificationType) -> usize {
        self.received
            .lock()
            .iter()
            .filter(|n| n.kind() == kind)
            .count()
    }

    /// Forget everything received so far.
    pub fn clear(&self) {
        self.received.lock().clear();
    }
}

impl Observer for RecordingObserver {
    fn on_notification(&self, notification: &StatusNotification) -> Result<(), ObserverError> {
        self.received.lock().push(notification.clone());
        Ok(())
    }
}
