//! Helper pairing state and availability verdicts.

use crate::HelperId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Pairing state of a helper relative to one secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PairingState {
    /// The relationship has been dissolved. Terminal.
    Unpaired,
    /// Pairing was attempted and did not succeed.
    PairingFailed,
    /// Paired, but the helper is not currently responding.
    PairedInactive,
    /// Paired and responding.
    PairedActive,
}

impl PairingState {
    /// Whether the helper holds a pairing (active or not).
    pub fn is_paired(self) -> bool {
        matches!(self, PairingState::PairedActive | PairingState::PairedInactive)
    }

    /// Whether the helper counts towards secret availability.
    pub fn is_active(self) -> bool {
        self == PairingState::PairedActive
    }

    /// Whether no further transition is allowed out of this state.
    pub fn is_terminal(self) -> bool {
        self == PairingState::Unpaired
    }
}

impl fmt::Display for PairingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PairingState::Unpaired => "unpaired",
            PairingState::PairingFailed => "pairing-failed",
            PairingState::PairedInactive => "paired-inactive",
            PairingState::PairedActive => "paired-active",
        };
        f.write_str(name)
    }
}

/// Relationship state between a secret owner and one helper ("pairable").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HelperStatus {
    /// Helper identity.
    pub helper: HelperId,
    /// Current pairing state.
    pub pairing: PairingState,
    /// Last time the helper was seen alive, since the UNIX epoch.
    pub last_activity: Option<Duration>,
}

impl HelperStatus {
    /// Create a status with no recorded activity.
    pub fn new(helper: HelperId, pairing: PairingState) -> Self {
        Self {
            helper,
            pairing,
            last_activity: None,
        }
    }

    /// Create a paired-active status seen at `now`.
    pub fn active(helper: HelperId, now: Duration) -> Self {
        Self {
            helper,
            pairing: PairingState::PairedActive,
            last_activity: Some(now),
        }
    }
}

impl fmt::Display for HelperStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.helper, self.pairing)
    }
}

/// Quorum verdict for a round, or availability of a whole secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    /// Threshold neither reached nor ruled out.
    InProgress,
    /// At least `threshold` helpers acknowledged.
    Available,
    /// The threshold can no longer be reached.
    Unavailable,
}

impl Verdict {
    /// Whether the verdict can no longer change for the round.
    pub fn is_decided(self) -> bool {
        !matches!(self, Verdict::InProgress)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verdict::InProgress => "IN_PROGRESS",
            Verdict::Available => "AVAILABLE",
            Verdict::Unavailable => "UNAVAILABLE",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pairing_state_classification() {
        assert!(PairingState::PairedActive.is_paired());
        assert!(PairingState::PairedInactive.is_paired());
        assert!(!PairingState::PairingFailed.is_paired());
        assert!(!PairingState::Unpaired.is_paired());

        assert!(PairingState::PairedActive.is_active());
        assert!(!PairingState::PairedInactive.is_active());

        assert!(PairingState::Unpaired.is_terminal());
        assert!(!PairingState::PairingFailed.is_terminal());
    }

    #[test]
    fn test_helper_status_constructors() {
        let status = HelperStatus::active(HelperId(1), Duration::from_secs(10));
        assert_eq!(status.pairing, PairingState::PairedActive);
        assert_eq!(status.last_activity, Some(Duration::from_secs(10)));

        let failed = HelperStatus::new(HelperId(2), PairingState::PairingFailed);
        assert_eq!(failed.last_activity, None);
        assert_eq!(failed.to_string(), "Helper(2) (pairing-failed)");
    }

    #[test]
    fn test_verdict_decided() {
        assert!(!Verdict::InProgress.is_decided());
        assert!(Verdict::Available.is_decided());
        assert!(Verdict::Unavailable.is_decided());
    }
}
