//! Complaint record types
//!
//! The record store owns these; the escalation subsystem only reads the
//! fields it needs and mutates `status` / `escalation`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Category assigned to records created before the field existed.
pub const DEFAULT_CATEGORY: &str = "General";

/// Intake-assigned urgency tier.
///
/// Parsed case-insensitively. Values outside the three known tiers are kept
/// verbatim so they can still be reported, and fall back to the low limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Priority {
    High,
    Medium,
    Low,
    Unrecognized(String),
}

impl Priority {
    pub fn as_str(&self) -> &str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::Unrecognized(raw) => raw,
        }
    }

    /// The three tiers the limits table knows about.
    pub fn known() -> [Priority; 3] {
        [Self::High, Self::Medium, Self::Low]
    }
}

impl From<&str> for Priority {
    fn from(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            "low" => Self::Low,
            _ => Self::Unrecognized(s.to_string()),
        }
    }
}

impl From<String> for Priority {
    fn from(s: String) -> Self {
        Priority::from(s.as_str())
    }
}

impl From<Priority> for String {
    fn from(p: Priority) -> Self {
        p.as_str().to_string()
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Complaint lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplaintStatus {
    Pending,
    InProgress,
    Resolved,
    Escalated,
}

impl ComplaintStatus {
    /// Resolved and escalated complaints are never selected by a sweep.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Resolved | Self::Escalated)
    }

    /// Forward-only lifecycle:
    /// `pending → in-progress → {resolved | escalated}` or `pending → escalated`.
    pub fn can_transition_to(self, next: ComplaintStatus) -> bool {
        use ComplaintStatus::*;
        matches!(
            (self, next),
            (Pending, InProgress)
                | (Pending, Escalated)
                | (Pending, Resolved)
                | (InProgress, Resolved)
                | (InProgress, Escalated)
        )
    }
}

impl std::fmt::Display for ComplaintStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::InProgress => write!(f, "in-progress"),
            Self::Resolved => write!(f, "resolved"),
            Self::Escalated => write!(f, "escalated"),
        }
    }
}

/// Name and address of a citizen or staff member.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Contact {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
        }
    }

    /// Email address, ignoring blank strings.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().map(str::trim).filter(|e| !e.is_empty())
    }
}

/// Escalation metadata, written once when a complaint escalates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationRecord {
    #[serde(default)]
    pub is_escalated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalated_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_notes: Option<String>,
}

/// A citizen complaint as seen by the escalation subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Complaint {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pincode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub priority: Priority,
    pub status: ComplaintStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub escalation: EscalationRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Contact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<Contact>,
}

impl Complaint {
    /// New pending complaint created now.
    pub fn new(id: impl Into<String>, title: impl Into<String>, priority: Priority) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: String::new(),
            address: String::new(),
            pincode: None,
            category: None,
            priority,
            status: ComplaintStatus::Pending,
            created_at: Utc::now(),
            escalation: EscalationRecord::default(),
            created_by: None,
            assigned_to: None,
        }
    }

    pub fn with_status(mut self, status: ComplaintStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_created_by(mut self, contact: Contact) -> Self {
        self.created_by = Some(contact);
        self
    }

    pub fn with_assigned_to(mut self, contact: Contact) -> Self {
        self.assigned_to = Some(contact);
        self
    }

    /// Category, or [`DEFAULT_CATEGORY`] for older records without one.
    pub fn category(&self) -> &str {
        self.category
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    /// Write the default category into records that predate the field.
    ///
    /// Returns `true` if the record changed.
    pub fn backfill_category(&mut self) -> bool {
        if self.category.as_deref().is_some_and(|c| !c.trim().is_empty()) {
            return false;
        }
        self.category = Some(DEFAULT_CATEGORY.to_string());
        true
    }

    /// Citizen email, if the submitter left one.
    pub fn citizen_email(&self) -> Option<&str> {
        self.created_by.as_ref().and_then(Contact::email)
    }

    /// Assigned staff email, if any.
    pub fn staff_email(&self) -> Option<&str> {
        self.assigned_to.as_ref().and_then(Contact::email)
    }

    /// Whole days since creation, truncated.
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.created_at).num_days()
    }
}
