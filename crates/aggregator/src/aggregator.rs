//! Per-secret availability state.

use crate::AggregatorError;
use derec_types::{
    HelperId, HelperStatus, NotificationType, PairingState, SecretId, StatusNotification, Verdict,
    Version,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Derives secret-level availability from the active version's verdict and
/// the helpers' pairing states.
///
/// The secret is available iff the active version's verdict is AVAILABLE and
/// at least `threshold` helpers are paired and active. Only transitions are
/// reported: recomputing an unchanged availability emits nothing.
#[derive(Debug)]
pub struct SecretAggregator {
    secret: SecretId,
    threshold: usize,
    helpers: BTreeMap<HelperId, HelperStatus>,
    /// Most recent version and its latest verdict.
    active: Option<(Version, Verdict)>,
    /// Last availability reported (or assumed, before any report).
    availability: Verdict,
}

impl SecretAggregator {
    /// Create an aggregator. The secret starts unavailable without a
    /// notification being emitted.
    pub fn new(
        secret: SecretId,
        threshold: usize,
        helpers: impl IntoIterator<Item = HelperStatus>,
    ) -> Result<Self, AggregatorError> {
        if threshold == 0 {
            return Err(AggregatorError::ZeroThreshold);
        }
        Ok(Self {
            secret,
            threshold,
            helpers: helpers.into_iter().map(|s| (s.helper, s)).collect(),
            active: None,
            availability: Verdict::Unavailable,
        })
    }

    pub fn secret(&self) -> SecretId {
        self.secret
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Last reported availability: `Available` or `Unavailable`.
    pub fn availability(&self) -> Verdict {
        self.availability
    }

    /// The version availability is currently derived from.
    pub fn active_version(&self) -> Option<&Version> {
        self.active.as_ref().map(|(version, _)| version)
    }

    /// Latest verdict of the active version.
    pub fn active_verdict(&self) -> Option<Verdict> {
        self.active.map(|(_, verdict)| verdict)
    }

    pub fn helper(&self, helper: HelperId) -> Option<&HelperStatus> {
        self.helpers.get(&helper)
    }

    /// Helpers currently holding a pairing, active or not.
    pub fn paired_helpers(&self) -> impl Iterator<Item = &HelperStatus> + '_ {
        self.helpers.values().filter(|s| s.pairing.is_paired())
    }

    pub fn paired_active_count(&self) -> usize {
        self.helpers
            .values()
            .filter(|s| s.pairing.is_active())
            .count()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // Inputs
    // ═══════════════════════════════════════════════════════════════════════════

    /// Feed a round verdict for `version`.
    ///
    /// A newer version becomes active. For the active version a decided
    /// verdict replaces the stored one, while the IN_PROGRESS verdict of a
    /// freshly started round does not downgrade it. Older versions are
    /// ignored.
    pub fn on_round_verdict(&mut self, version: Version, verdict: Verdict) -> Vec<StatusNotification> {
        if version.secret != self.secret {
            debug!(secret = %self.secret, %version, "Ignoring verdict for another secret");
            return vec![];
        }

        match self.active {
            Some((active, _)) if version.number < active.number => {
                debug!(
                    secret = %self.secret,
                    %version,
                    active = %active,
                    "Ignoring verdict for superseded version"
                );
                return vec![];
            }
            Some((active, current))
                if version.number == active.number
                    && (verdict == current || !verdict.is_decided()) =>
            {
                return vec![];
            }
            _ => {}
        }

        debug!(secret = %self.secret, %version, %verdict, "Active version verdict updated");
        self.active = Some((version, verdict));
        self.evaluate().into_iter().collect()
    }

    /// Apply a helper pairing transition.
    ///
    /// Relays the matching HELPER_* notification, then re-evaluates secret
    /// availability in the same call.
    pub fn on_helper_status(
        &mut self,
        status: HelperStatus,
    ) -> Result<Vec<StatusNotification>, AggregatorError> {
        let previous = self.helpers.get(&status.helper).copied();

        if let Some(previous) = previous {
            if previous.pairing.is_terminal() && status.pairing != previous.pairing {
                return Err(AggregatorError::HelperUnpaired {
                    helper: status.helper,
                });
            }
            if previous.pairing == status.pairing {
                // Liveness refresh only.
                if let (Some(entry), Some(at)) =
                    (self.helpers.get_mut(&status.helper), status.last_activity)
                {
                    entry.last_activity = Some(at);
                }
                return Ok(vec![]);
            }
        }

        self.helpers.insert(status.helper, status);
        debug!(
            secret = %self.secret,
            helper = %status.helper,
            from = ?previous.map(|p| p.pairing),
            to = %status.pairing,
            "Helper status changed"
        );

        let mut notifications = Vec::new();
        if let Some(kind) = relay_kind(previous.map(|p| p.pairing), status.pairing) {
            notifications.push(StatusNotification::helper(
                kind,
                self.secret,
                status,
                format!("{} is now {}", status.helper, status.pairing),
            ));
        }
        notifications.extend(self.evaluate());
        Ok(notifications)
    }

    /// Recompute availability and report an edge, if any.
    fn evaluate(&mut self) -> Option<StatusNotification> {
        let active_count = self.paired_active_count();
        let version_available = matches!(self.active, Some((_, Verdict::Available)));
        let next = if version_available && active_count >= self.threshold {
            Verdict::Available
        } else {
            Verdict::Unavailable
        };

        if next == self.availability {
            return None;
        }
        self.availability = next;

        info!(
            secret = %self.secret,
            availability = %next,
            active_helpers = active_count,
            threshold = self.threshold,
            "Secret availability changed"
        );

        let (kind, message) = match next {
            Verdict::Available => (
                NotificationType::SecretAvailable,
                format!(
                    "secret recoverable: {} active helpers, threshold {}",
                    active_count, self.threshold
                ),
            ),
            Verdict::Unavailable | Verdict::InProgress => (
                NotificationType::SecretUnavailable,
                if version_available {
                    format!(
                        "only {} active helpers, threshold {}",
                        active_count, self.threshold
                    )
                } else {
                    "latest version is not recoverable".to_string()
                },
            ),
        };

        let mut notification = StatusNotification::new(kind, self.secret, message);
        if let Some((version, _)) = self.active {
            notification = notification.with_version(version);
        }
        Some(notification)
    }
}

/// Pass-through notification for a pairing transition.
fn relay_kind(previous: Option<PairingState>, next: PairingState) -> Option<NotificationType> {
    match next {
        PairingState::PairedActive => Some(NotificationType::HelperReady),
        PairingState::PairedInactive => match previous {
            Some(PairingState::PairedActive) => Some(NotificationType::HelperInactive),
            _ => None,
        },
        PairingState::PairingFailed => Some(NotificationType::HelperNotPaired),
        PairingState::Unpaired => Some(NotificationType::HelperUnpaired),
    }
}
