//! Core types for DeRec status tracking.
//!
//! Pure data: identifiers, helper pairing state, per-round outcomes,
//! verdicts and the closed notification taxonomy.

mod identifiers;
mod notification;
mod operation;
mod status;

pub use identifiers::{HelperId, RoundNumber, SecretId, Version, VersionNumber};
pub use notification::{NotificationType, OperationStage, StatusNotification};
pub use operation::{OperationKind, OperationOutcome, RoundKey};
pub use status::{HelperStatus, PairingState, Verdict};
