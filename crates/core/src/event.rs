//! Events consumed by the state machines.

use derec_types::{RoundKey, Verdict, Version};

/// Inputs that drive the status state machines besides direct calls from
/// the transport and the pairing manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The completion deadline of a round elapsed.
    RoundTimeout { key: RoundKey },

    /// A round's quorum verdict changed.
    ///
    /// Routed to the secret's aggregator.
    RoundVerdictChanged {
        key: RoundKey,
        version: Version,
        verdict: Verdict,
    },
}

impl Event {
    /// Get a human-readable name for this event type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::RoundTimeout { .. } => "RoundTimeout",
            Event::RoundVerdictChanged { .. } => "RoundVerdictChanged",
        }
    }
}
