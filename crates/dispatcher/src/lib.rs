//! Notification dispatcher.
//!
//! The process-wide fan-out point between the status state machines and the
//! application. Observers subscribe and unsubscribe explicitly; every
//! published notification is delivered synchronously, in registration order,
//! with failures isolated per observer.
//!
//! The process-wide instance must be installed with [`init_global`] before
//! [`global`] returns it. Components that prefer explicit wiring can hold
//! their own `Arc<NotificationDispatcher>` instead.

mod dispatcher;
mod error;
mod observer;

pub use dispatcher::{DeliveryReport, NotificationDispatcher, SubscriptionId};
pub use error::{DispatcherError, ObserverError};
pub use observer::{ChannelObserver, FnObserver, Observer};

use std::sync::{Arc, OnceLock};

static GLOBAL: OnceLock<Arc<NotificationDispatcher>> = OnceLock::new();

/// Install the process-wide dispatcher. Fails if one is already installed.
pub fn init_global(dispatcher: Arc<NotificationDispatcher>) -> Result<(), DispatcherError> {
    GLOBAL
        .set(dispatcher)
        .map_err(|_| DispatcherError::AlreadyInitialized)
}

/// The process-wide dispatcher, if [`init_global`] has been called.
pub fn global() -> Option<Arc<NotificationDispatcher>> {
    GLOBAL.get().cloned()
}
