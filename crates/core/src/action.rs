//! Actions returned by the state machines.

use crate::Event;
use derec_types::{RoundKey, StatusNotification};
use std::time::Duration;

/// Timers the runner arms on behalf of a state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Completion deadline of an operation round.
    RoundTimeout(RoundKey),
}

/// Side effects requested by a state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Delivery
    // ═══════════════════════════════════════════════════════════════════════
    /// Publish a notification to every registered observer.
    Notify(StatusNotification),

    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// Arm (or re-arm) a timer.
    SetTimer { id: TimerId, duration: Duration },

    /// Cancel a timer if it is still armed.
    CancelTimer { id: TimerId },

    // ═══════════════════════════════════════════════════════════════════════
    // Internal routing
    // ═══════════════════════════════════════════════════════════════════════
    /// Feed an event to another state machine in the same process.
    EnqueueInternal { event: Event },
}

impl Action {
    /// Get a human-readable name for this action type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Notify(_) => "Notify",
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::EnqueueInternal { .. } => "EnqueueInternal",
        }
    }

    /// The notification carried by this action, if any.
    pub fn as_notification(&self) -> Option<&StatusNotification> {
        match self {
            Action::Notify(notification) => Some(notification),
            _ => None,
        }
    }

    /// Check if this is a timer action.
    pub fn is_timer(&self) -> bool {
        matches!(self, Action::SetTimer { .. } | Action::CancelTimer { .. })
    }
}
