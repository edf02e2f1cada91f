//! Escalation Policy — pure overdue check
//!
//! Decides whether a complaint has outlived its priority's day limit. No
//! I/O and no mutation, so every branch is testable with a fixed `now`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::EscalationLimits;
use crate::model::Complaint;

/// Outcome of evaluating one complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationCheck {
    pub needs_escalation: bool,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_overdue: Option<i64>,
}

impl EscalationCheck {
    fn hold(reason: &str) -> Self {
        Self {
            needs_escalation: false,
            reason: reason.to_string(),
            days_overdue: None,
        }
    }
}

/// Decide whether `complaint` must escalate at `now`.
pub fn evaluate(
    complaint: &Complaint,
    limits: &EscalationLimits,
    now: DateTime<Utc>,
) -> EscalationCheck {
    if complaint.status.is_terminal() {
        return EscalationCheck::hold("already resolved or escalated");
    }

    let days = complaint.age_days(now);
    let limit = limits.limit_for(&complaint.priority);

    if days >= i64::from(limit) {
        return EscalationCheck {
            needs_escalation: true,
            reason: format!(
                "exceeded {} day limit for {} priority",
                limit, complaint.priority
            ),
            days_overdue: Some(days - i64::from(limit)),
        };
    }

    EscalationCheck::hold("within time limit")
}

/// Whole days left before `complaint` crosses its limit, zero once overdue.
pub fn days_until_escalation(
    complaint: &Complaint,
    limits: &EscalationLimits,
    now: DateTime<Utc>,
) -> i64 {
    let limit = i64::from(limits.limit_for(&complaint.priority));
    (limit - complaint.age_days(now)).max(0)
}

/// Read-only escalation status for a single complaint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationStatus {
    pub should_escalate: bool,
    pub escalation_reason: String,
    pub days_since_creation: i64,
    pub escalation_limit: u32,
}

/// Build the status view for a complaint without touching it.
pub fn status_of(
    complaint: &Complaint,
    limits: &EscalationLimits,
    now: DateTime<Utc>,
) -> EscalationStatus {
    let check = evaluate(complaint, limits, now);
    EscalationStatus {
        should_escalate: check.needs_escalation,
        escalation_reason: check.reason,
        days_since_creation: complaint.age_days(now),
        escalation_limit: limits.limit_for(&complaint.priority),
    }
}
