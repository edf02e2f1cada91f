//! Notification Gateway
//!
//! Turns complaint events into outgoing messages and hands them to a
//! [`NotificationTransport`]. One attempt per call, no retry.
//!
//! ```text
//! escalation_alert ──► admin address, or the transport's account owner
//! citizen_notice   ──► createdBy.email   (NoRecipient if absent)
//! staff_reminder   ──► assignedTo.email  (NoRecipient if absent)
//! test_message     ──► any address
//! ```
//!
//! "Nothing to send" is an `Ok(SendOutcome::NoRecipient)`. A transport that
//! could not complete the exchange is an `Err(NotifyError)`.

pub mod messages;
pub mod web3forms;

pub use web3forms::Web3FormsTransport;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::model::Complaint;

/// Transport-level failures.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Who a message is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipient {
    /// The administrative account that owns the transport
    Administrator,
    /// A specific address
    Address(String),
}

impl std::fmt::Display for Recipient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Administrator => write!(f, "administrator"),
            Self::Address(addr) => write!(f, "{}", addr),
        }
    }
}

/// A fully rendered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub recipient: Recipient,
    pub subject: String,
    pub body: String,
}

/// What the delivery channel reported for one message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delivery {
    pub success: bool,
    pub message_id: Option<String>,
    /// Provider's explanation when `success` is false
    pub detail: Option<String>,
}

impl Delivery {
    pub fn accepted(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            detail: None,
        }
    }

    pub fn refused(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            detail: Some(detail.into()),
        }
    }
}

/// Delivery channel for rendered messages.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<Delivery, NotifyError>;
}

/// Shared reference to a transport
pub type SharedTransport = Arc<dyn NotificationTransport>;

/// Result of one gateway send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SendOutcome {
    Delivered {
        recipient: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    Failed {
        error: String,
    },
    NoRecipient {
        reason: String,
    },
}

impl SendOutcome {
    pub fn success(&self) -> bool {
        matches!(self, Self::Delivered { .. })
    }

    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::Delivered { message_id, .. } => message_id.as_deref(),
            _ => None,
        }
    }
}

/// Renders complaint notifications and sends them through a transport.
pub struct NotificationGateway {
    transport: SharedTransport,
    admin_recipient: String,
}

impl NotificationGateway {
    pub fn new(transport: SharedTransport, admin_recipient: impl Into<String>) -> Self {
        Self {
            transport,
            admin_recipient: admin_recipient.into(),
        }
    }

    /// Create a shared reference to this gateway
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn admin_recipient(&self) -> &str {
        &self.admin_recipient
    }

    /// Where escalation alerts go. A configured recipient that is not an
    /// email address is a display label, and alerts fall back to the
    /// transport's own inbox.
    pub fn alert_recipient(&self) -> Recipient {
        let admin = self.admin_recipient.trim();
        if admin.contains('@') {
            Recipient::Address(admin.to_string())
        } else {
            Recipient::Administrator
        }
    }

    /// Tell the administrator a complaint escalated.
    pub async fn escalation_alert(
        &self,
        complaint: &Complaint,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<SendOutcome, NotifyError> {
        let message = messages::escalation_alert(self.alert_recipient(), complaint, reason, now);
        self.deliver(&complaint.id, message).await
    }

    /// Tell the citizen their complaint escalated.
    pub async fn citizen_notice(&self, complaint: &Complaint) -> Result<SendOutcome, NotifyError> {
        let Some(email) = complaint.citizen_email() else {
            return Ok(SendOutcome::NoRecipient {
                reason: "no citizen email available".to_string(),
            });
        };
        let message = messages::citizen_notice(complaint, email);
        self.deliver(&complaint.id, message).await
    }

    /// Warn the assigned staff member that escalation is near.
    pub async fn staff_reminder(
        &self,
        complaint: &Complaint,
        days_until_escalation: i64,
        now: DateTime<Utc>,
    ) -> Result<SendOutcome, NotifyError> {
        let Some(email) = complaint.staff_email() else {
            return Ok(SendOutcome::NoRecipient {
                reason: "no staff email available".to_string(),
            });
        };
        let message = messages::staff_reminder(complaint, email, days_until_escalation, now);
        self.deliver(&complaint.id, message).await
    }

    /// Send a test message to verify transport configuration.
    pub async fn test_message(
        &self,
        address: &str,
        now: DateTime<Utc>,
    ) -> Result<SendOutcome, NotifyError> {
        let message = messages::test_message(address, now);
        self.deliver("-", message).await
    }

    async fn deliver(
        &self,
        complaint_id: &str,
        message: OutgoingMessage,
    ) -> Result<SendOutcome, NotifyError> {
        let delivery = self.transport.send(&message).await?;
        if delivery.success {
            debug!(
                complaint_id,
                recipient = %message.recipient,
                message_id = delivery.message_id.as_deref().unwrap_or(""),
                "Notification sent"
            );
            Ok(SendOutcome::Delivered {
                recipient: message.recipient.to_string(),
                message_id: delivery.message_id,
            })
        } else {
            let error = delivery
                .detail
                .unwrap_or_else(|| "delivery refused".to_string());
            warn!(complaint_id, recipient = %message.recipient, %error, "Notification refused");
            Ok(SendOutcome::Failed { error })
        }
    }
}
