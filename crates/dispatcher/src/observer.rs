//! Observer trait and stock observers.

use crate::ObserverError;
use derec_types::StatusNotification;
use tokio::sync::mpsc;

/// Receives status notifications from the dispatcher.
///
/// Called synchronously on the publishing thread, so implementations should
/// return quickly. Publishers may hold their own ordering locks while they
/// deliver: calling back into the publisher from the same thread is fine,
/// but blocking on another thread that publishes for the same source can
/// deadlock. Slow or blocking consumers should use a [`ChannelObserver`] and
/// do their work on the receiving side.
pub trait Observer: Send + Sync {
    /// Handle one notification.
    fn on_notification(&self, notification: &StatusNotification) -> Result<(), ObserverError>;
}

/// Forwards notifications into an unbounded channel.
///
/// Decouples emission latency from the consumer: the dispatcher only pays
/// for a queue push.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: mpsc::UnboundedSender<StatusNotification>,
}

impl ChannelObserver {
    /// Create an observer and the receiver it feeds.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<StatusNotification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Observer for ChannelObserver {
    fn on_notification(&self, notification: &StatusNotification) -> Result<(), ObserverError> {
        self.sender
            .send(notification.clone())
            .map_err(|_| ObserverError::Disconnected)
    }
}

/// Adapts a closure into an [`Observer`].
pub struct FnObserver<F>(F);

impl<F> FnObserver<F>
where
    F: Fn(&StatusNotification) -> Result<(), ObserverError> + Send + Sync,
{
    pub fn new(f: F) -> Self {
        Self(f)
    }
}

impl<F> Observer for FnObserver<F>
where
    F: Fn(&StatusNotification) -> Result<(), ObserverError> + Send + Sync,
{
    fn on_notification(&self, notification: &StatusNotification) -> Result<(), ObserverError> {
        (self.0)(notification)
    }
}
