//! Operation rounds and per-helper outcomes.

use crate::{RoundNumber, SecretId, VersionNumber};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two long-running operations a secret owner runs against its helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    /// Push a new share/version to helpers.
    Update,
    /// Confirm helpers still hold a recoverable share.
    Verify,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Update => f.write_str("UPDATE"),
            OperationKind::Verify => f.write_str("VERIFY"),
        }
    }
}

/// Outcome of one helper within one round.
///
/// Every slot starts `Pending` and is resolved at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationOutcome {
    Pending,
    Acknowledged,
    Rejected,
    TimedOut,
}

impl OperationOutcome {
    /// Whether this outcome resolves the helper's slot.
    pub fn is_resolved(self) -> bool {
        self != OperationOutcome::Pending
    }
}

impl fmt::Display for OperationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationOutcome::Pending => "pending",
            OperationOutcome::Acknowledged => "acknowledged",
            OperationOutcome::Rejected => "rejected",
            OperationOutcome::TimedOut => "timed-out",
        };
        f.write_str(name)
    }
}

/// Identifies one round of one operation on one version of a secret.
///
/// UPDATE and VERIFY rounds for the same version have distinct keys and
/// therefore distinct trackers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundKey {
    pub secret: SecretId,
    pub version: VersionNumber,
    pub kind: OperationKind,
    pub round: RoundNumber,
}

impl RoundKey {
    /// Create a new round key.
    pub fn new(
        secret: SecretId,
        version: VersionNumber,
        kind: OperationKind,
        round: RoundNumber,
    ) -> Self {
        Self {
            secret,
            version,
            kind,
            round,
        }
    }

    /// Key of the retry round for the same operation.
    pub fn retry(self) -> Self {
        Self {
            round: self.round.next(),
            ..self
        }
    }
}

impl fmt::Display for RoundKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}@{} {}",
            self.kind, self.secret, self.version, self.round
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_resolution() {
        assert!(!OperationOutcome::Pending.is_resolved());
        assert!(OperationOutcome::Acknowledged.is_resolved());
        assert!(OperationOutcome::Rejected.is_resolved());
        assert!(OperationOutcome::TimedOut.is_resolved());
    }

    #[test]
    fn test_update_and_verify_rounds_are_distinct() {
        let update = RoundKey::new(
            SecretId(1),
            VersionNumber(2),
            OperationKind::Update,
            RoundNumber::FIRST,
        );
        let verify = RoundKey {
            kind: OperationKind::Verify,
            ..update
        };
        assert_ne!(update, verify);
        assert_eq!(update.retry().round, RoundNumber(1));
        assert_eq!(update.retry().kind, OperationKind::Update);
    }
}
