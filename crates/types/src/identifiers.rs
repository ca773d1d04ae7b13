//! Domain-specific identifier types.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Secret identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SecretId(pub u64);

impl fmt::Display for SecretId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", self.0)
    }
}

/// Helper identifier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct HelperId(pub u64);

impl fmt::Display for HelperId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Helper({})", self.0)
    }
}

/// Version sequence number of a secret.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VersionNumber(pub u64);

impl VersionNumber {
    /// The first version of a secret.
    pub const INITIAL: Self = VersionNumber(0);

    /// Get the next version number.
    pub fn next(self) -> Self {
        VersionNumber(self.0 + 1)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Attempt number of an operation. A retry is a new round.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoundNumber(pub u32);

impl RoundNumber {
    /// The first round of an operation.
    pub const FIRST: Self = RoundNumber(0);

    /// Get the next round number.
    pub fn next(self) -> Self {
        RoundNumber(self.0 + 1)
    }
}

impl fmt::Display for RoundNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round-{}", self.0)
    }
}

/// An immutable snapshot of a secret's protected state.
///
/// Produced by an UPDATE operation and never mutated afterwards. Only the
/// acknowledgement status held by its trackers changes over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Version {
    /// Secret this version belongs to.
    pub secret: SecretId,
    /// Sequence number within the secret.
    pub number: VersionNumber,
    /// Creation time as a duration since the UNIX epoch.
    pub created_at: Duration,
}

impl Version {
    /// Create a new version reference.
    pub fn new(secret: SecretId, number: VersionNumber, created_at: Duration) -> Self {
        Self {
            secret,
            number,
            created_at,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.secret, self.number)
    }
}
