//! Error types for notification delivery.

use thiserror::Error;

/// Errors raised by an observer while handling a notification.
///
/// Isolated per observer: they are logged and never reach the emitter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObserverError {
    /// The observer's receiving side is gone.
    #[error("Observer disconnected")]
    Disconnected,

    /// The observer refused the notification.
    #[error("Observer rejected notification: {0}")]
    Rejected(String),
}

/// Errors from the process-wide dispatcher registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatcherError {
    /// `init_global` was called more than once.
    #[error("Global dispatcher already initialized")]
    AlreadyInitialized,
}
