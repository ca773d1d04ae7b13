//! Core vocabulary for the status state machines.
//!
//! Trackers and aggregators are synchronous and perform no I/O. They consume
//! [`Event`]s and return [`Action`]s; the runner publishes notifications,
//! arms timers and routes internal events.
//!
//! ```text
//! helper response ──► OperationTracker ──► Vec<Action>
//!                                           │
//!             ┌─────────────────────────────┼──────────────────────┐
//!             ▼                             ▼                      ▼
//!      Action::Notify             Action::SetTimer /      Action::EnqueueInternal
//!      (dispatcher)               CancelTimer (runner)    (SecretAggregator)
//! ```

mod action;
mod event;

pub use action::{Action, TimerId};
pub use event::Event;
