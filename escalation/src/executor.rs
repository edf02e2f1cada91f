//! Escalation Executor — applies one escalation
//!
//! Transitions a complaint to `escalated`, persists it, then notifies the
//! administrator and (when reachable) the citizen. The write is the commit
//! point: notification failures after it are reported, never rolled back.
//!
//! The status check runs against the stored record, not the caller's copy,
//! and the re-read plus write are serialized per executor. A sweep holding a
//! stale batch and a manual escalation therefore cannot both escalate the
//! same complaint.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::EscalationLimits;
use crate::model::{Complaint, ComplaintStatus, EscalationRecord};
use crate::notify::{NotificationGateway, NotifyError, SendOutcome};
use crate::store::{SharedComplaintStore, StoreError};

/// Note stored on every automatic escalation.
pub const ESCALATION_NOTES: &str = "Complaint automatically escalated due to resolution delays";

/// Errors from escalating a single complaint
#[derive(Debug, thiserror::Error)]
pub enum EscalationError {
    #[error("Complaint {id} cannot be escalated from status {from}")]
    InvalidTransition { id: String, from: ComplaintStatus },

    #[error("Failed to reload complaint {id} before escalating: {source}")]
    Reload {
        id: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to persist escalation of complaint {id}: {source}")]
    Persist {
        id: String,
        #[source]
        source: StoreError,
    },
}

/// Result of a first-time escalation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationReport {
    pub success: bool,
    pub complaint: Complaint,
    pub escalation_email_sent: bool,
    pub citizen_notification_sent: bool,
}

/// What `escalate` did.
#[derive(Debug, Clone)]
pub enum EscalationOutcome {
    /// Status changed and was persisted
    Escalated(EscalationReport),
    /// Complaint was already escalated; nothing written or sent
    AlreadyEscalated { complaint_id: String },
}

impl EscalationOutcome {
    pub fn already_escalated(&self) -> bool {
        matches!(self, Self::AlreadyEscalated { .. })
    }

    pub fn report(&self) -> Option<&EscalationReport> {
        match self {
            Self::Escalated(report) => Some(report),
            Self::AlreadyEscalated { .. } => None,
        }
    }
}

/// Applies escalation transitions and their notifications.
pub struct EscalationExecutor {
    store: SharedComplaintStore,
    gateway: Arc<NotificationGateway>,
    limits: EscalationLimits,
    notify_timeout: Duration,
    commit: Mutex<()>,
}

impl EscalationExecutor {
    pub fn new(
        store: SharedComplaintStore,
        gateway: Arc<NotificationGateway>,
        limits: EscalationLimits,
        notify_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            limits,
            notify_timeout,
            commit: Mutex::new(()),
        }
    }

    pub fn limits(&self) -> &EscalationLimits {
        &self.limits
    }

    /// Escalate `complaint` now.
    pub async fn escalate(&self, complaint: Complaint) -> Result<EscalationOutcome, EscalationError> {
        self.escalate_at(complaint, Utc::now()).await
    }

    /// Escalate `complaint`, stamping `now` as the escalation time.
    pub async fn escalate_at(
        &self,
        complaint: Complaint,
        now: DateTime<Utc>,
    ) -> Result<EscalationOutcome, EscalationError> {
        if complaint.status == ComplaintStatus::Escalated {
            info!(complaint_id = %complaint.id, "Complaint already escalated, skipping");
            return Ok(EscalationOutcome::AlreadyEscalated {
                complaint_id: complaint.id,
            });
        }

        let reason = format!(
            "automatic escalation after {} days",
            self.limits.limit_for(&complaint.priority)
        );

        let complaint = {
            let _commit = self.commit.lock().await;

            let stored = self
                .store
                .find_by_id(&complaint.id)
                .await
                .map_err(|source| EscalationError::Reload {
                    id: complaint.id.clone(),
                    source,
                })?;
            let mut current = match stored {
                Some(stored) => {
                    if stored.status != complaint.status {
                        debug!(
                            complaint_id = %stored.id,
                            seen = %complaint.status,
                            stored = %stored.status,
                            "Caller held a stale copy, using stored record"
                        );
                    }
                    stored
                }
                None => complaint,
            };

            if current.status == ComplaintStatus::Escalated {
                info!(complaint_id = %current.id, "Complaint already escalated, skipping");
                return Ok(EscalationOutcome::AlreadyEscalated {
                    complaint_id: current.id,
                });
            }
            if !current.status.can_transition_to(ComplaintStatus::Escalated) {
                return Err(EscalationError::InvalidTransition {
                    id: current.id,
                    from: current.status,
                });
            }

            current.backfill_category();
            current.status = ComplaintStatus::Escalated;
            current.escalation = EscalationRecord {
                is_escalated: true,
                escalated_at: Some(now),
                escalated_to: Some(self.gateway.admin_recipient().to_string()),
                escalation_reason: Some(reason.clone()),
                escalation_notes: Some(ESCALATION_NOTES.to_string()),
            };

            self.store
                .save(&current)
                .await
                .map_err(|source| EscalationError::Persist {
                    id: current.id.clone(),
                    source,
                })?;
            current
        };

        let escalation_email_sent = self
            .bounded_send(
                "escalation_alert",
                &complaint.id,
                self.gateway.escalation_alert(&complaint, &reason, now),
            )
            .await;

        let citizen_notification_sent = if complaint.citizen_email().is_some() {
            self.bounded_send(
                "citizen_notice",
                &complaint.id,
                self.gateway.citizen_notice(&complaint),
            )
            .await
        } else {
            false
        };

        info!(
            complaint_id = %complaint.id,
            title = %complaint.title,
            priority = %complaint.priority,
            category = complaint.category(),
            escalation_email_sent,
            citizen_notification_sent,
            "Complaint escalated"
        );

        Ok(EscalationOutcome::Escalated(EscalationReport {
            success: true,
            complaint,
            escalation_email_sent,
            citizen_notification_sent,
        }))
    }

    /// Run one send under the per-send timeout. `true` only on delivery.
    async fn bounded_send<F>(&self, kind: &'static str, complaint_id: &str, send: F) -> bool
    where
        F: Future<Output = Result<SendOutcome, NotifyError>>,
    {
        match tokio::time::timeout(self.notify_timeout, send).await {
            Ok(Ok(outcome)) => outcome.success(),
            Ok(Err(e)) => {
                warn!(complaint_id, kind, error = %e, "Notification failed");
                false
            }
            Err(_) => {
                warn!(
                    complaint_id,
                    kind,
                    timeout_secs = self.notify_timeout.as_secs(),
                    "Notification timed out"
                );
                false
            }
        }
    }
}
