//! Application-facing status notifications.
//!
//! The taxonomy is closed: every consumer matches on [`NotificationType`]
//! exhaustively, so adding a variant is a compile error at each observer
//! until it is handled.

use crate::{HelperStatus, OperationKind, SecretId, Version};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of an UPDATE or VERIFY round that a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStage {
    Progress,
    Available,
    Failed,
    Complete,
}

/// Kind of a status notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    UpdateProgress,
    /// Enough acknowledgements arrived for the update to be recoverable.
    UpdateAvailable,
    UpdateFailed,
    /// Every helper in the update round replied or failed.
    UpdateComplete,
    VerifyProgress,
    /// Enough acknowledgements arrived for the verification.
    VerifyAvailable,
    VerifyFailed,
    /// Every helper in the verify round replied or failed.
    VerifyComplete,
    /// Pairing with a helper failed.
    HelperNotPaired,
    /// A previously active helper has become inactive.
    HelperInactive,
    /// A helper has become active.
    HelperReady,
    /// An unpair action completed for a helper.
    HelperUnpaired,
    /// A secret that was usable is no longer usable.
    SecretUnavailable,
    /// Enough helpers can receive updates and support recovery.
    SecretAvailable,
}

impl NotificationType {
    /// Every notification type, in declaration order.
    pub const ALL: [NotificationType; 14] = [
        NotificationType::UpdateProgress,
        NotificationType::UpdateAvailable,
        NotificationType::UpdateFailed,
        NotificationType::UpdateComplete,
        NotificationType::VerifyProgress,
        NotificationType::VerifyAvailable,
        NotificationType::VerifyFailed,
        NotificationType::VerifyComplete,
        NotificationType::HelperNotPaired,
        NotificationType::HelperInactive,
        NotificationType::HelperReady,
        NotificationType::HelperUnpaired,
        NotificationType::SecretUnavailable,
        NotificationType::SecretAvailable,
    ];

    /// Whether this kind signals something needing user attention.
    ///
    /// A static property of the variant; instance data never changes it.
    pub fn is_error(self) -> bool {
        match self {
            NotificationType::UpdateFailed
            | NotificationType::VerifyFailed
            | NotificationType::HelperNotPaired
            | NotificationType::HelperInactive
            | NotificationType::SecretUnavailable => true,
            NotificationType::UpdateProgress
            | NotificationType::UpdateAvailable
            | NotificationType::UpdateComplete
            | NotificationType::VerifyProgress
            | NotificationType::VerifyAvailable
            | NotificationType::VerifyComplete
            | NotificationType::HelperReady
            | NotificationType::HelperUnpaired
            | NotificationType::SecretAvailable => false,
        }
    }

    /// The operation this kind reports on, if it is an operation notification.
    pub fn operation_kind(self) -> Option<OperationKind> {
        match self {
            NotificationType::UpdateProgress
            | NotificationType::UpdateAvailable
            | NotificationType::UpdateFailed
            | NotificationType::UpdateComplete => Some(OperationKind::Update),
            NotificationType::VerifyProgress
            | NotificationType::VerifyAvailable
            | NotificationType::VerifyFailed
            | NotificationType::VerifyComplete => Some(OperationKind::Verify),
            NotificationType::HelperNotPaired
            | NotificationType::HelperInactive
            | NotificationType::HelperReady
            | NotificationType::HelperUnpaired
            | NotificationType::SecretUnavailable
            | NotificationType::SecretAvailable => None,
        }
    }

    /// Build the kind reporting `stage` of an operation.
    pub fn for_operation(kind: OperationKind, stage: OperationStage) -> Self {
        match (kind, stage) {
            (OperationKind::Update, OperationStage::Progress) => NotificationType::UpdateProgress,
            (OperationKind::Update, OperationStage::Available) => NotificationType::UpdateAvailable,
            (OperationKind::Update, OperationStage::Failed) => NotificationType::UpdateFailed,
            (OperationKind::Update, OperationStage::Complete) => NotificationType::UpdateComplete,
            (OperationKind::Verify, OperationStage::Progress) => NotificationType::VerifyProgress,
            (OperationKind::Verify, OperationStage::Available) => NotificationType::VerifyAvailable,
            (OperationKind::Verify, OperationStage::Failed) => NotificationType::VerifyFailed,
            (OperationKind::Verify, OperationStage::Complete) => NotificationType::VerifyComplete,
        }
    }

    /// The SCREAMING_SNAKE name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationType::UpdateProgress => "UPDATE_PROGRESS",
            NotificationType::UpdateAvailable => "UPDATE_AVAILABLE",
            NotificationType::UpdateFailed => "UPDATE_FAILED",
            NotificationType::UpdateComplete => "UPDATE_COMPLETE",
            NotificationType::VerifyProgress => "VERIFY_PROGRESS",
            NotificationType::VerifyAvailable => "VERIFY_AVAILABLE",
            NotificationType::VerifyFailed => "VERIFY_FAILED",
            NotificationType::VerifyComplete => "VERIFY_COMPLETE",
            NotificationType::HelperNotPaired => "HELPER_NOT_PAIRED",
            NotificationType::HelperInactive => "HELPER_INACTIVE",
            NotificationType::HelperReady => "HELPER_READY",
            NotificationType::HelperUnpaired => "HELPER_UNPAIRED",
            NotificationType::SecretUnavailable => "SECRET_UNAVAILABLE",
            NotificationType::SecretAvailable => "SECRET_AVAILABLE",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable status event delivered to observers.
///
/// Built completely before delivery and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusNotification {
    kind: NotificationType,
    message: String,
    secret: SecretId,
    version: Option<Version>,
    helper: Option<HelperStatus>,
}

impl StatusNotification {
    /// Create a notification about a secret.
    pub fn new(kind: NotificationType, secret: SecretId, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            secret,
            version: None,
            helper: None,
        }
    }

    /// Create a notification about a stage of an operation on `version`.
    pub fn operation(
        kind: OperationKind,
        stage: OperationStage,
        version: Version,
        message: impl Into<String>,
    ) -> Self {
        Self::new(
            NotificationType::for_operation(kind, stage),
            version.secret,
            message,
        )
        .with_version(version)
    }

    /// Create a notification about a helper of `secret`.
    pub fn helper(
        kind: NotificationType,
        secret: SecretId,
        status: HelperStatus,
        message: impl Into<String>,
    ) -> Self {
        Self::new(kind, secret, message).with_helper(status)
    }

    /// Attach a version reference.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    /// Attach a helper reference.
    pub fn with_helper(mut self, helper: HelperStatus) -> Self {
        self.helper = Some(helper);
        self
    }

    pub fn kind(&self) -> NotificationType {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn secret(&self) -> SecretId {
        self.secret
    }

    pub fn version(&self) -> Option<&Version> {
        self.version.as_ref()
    }

    pub fn helper_status(&self) -> Option<&HelperStatus> {
        self.helper.as_ref()
    }

    /// Shorthand for `self.kind().is_error()`.
    pub fn is_error(&self) -> bool {
        self.kind.is_error()
    }
}

impl fmt::Display for StatusNotification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.secret, self.message)
    }
}
