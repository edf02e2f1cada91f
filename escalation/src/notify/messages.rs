//! Message templates for escalation notifications.

use chrono::{DateTime, Utc};

use super::{OutgoingMessage, Recipient};
use crate::model::Complaint;

const FOOTER: &str = "This is an automated notification from the Government Complaint Management System.";

fn submitter_name(complaint: &Complaint) -> &str {
    complaint
        .created_by
        .as_ref()
        .and_then(|c| c.name.as_deref())
        .unwrap_or("Anonymous")
}

pub fn escalation_alert(
    recipient: Recipient,
    complaint: &Complaint,
    reason: &str,
    now: DateTime<Utc>,
) -> OutgoingMessage {
    let body = format!(
        "COMPLAINT ESCALATION ALERT\n\n\
         Complaint Details:\n\
         - ID: {id}\n\
         - Title: {title}\n\
         - Priority: {priority}\n\
         - Category: {category}\n\
         - Description: {description}\n\
         - Address: {address}\n\
         - Submitted by: {submitter}\n\
         - Days since submission: {days} days\n\n\
         Escalation Reason: {reason}\n\n\
         This complaint was escalated automatically because it was not resolved in time.\n\
         Please act on it and update its status.\n\n\
         {FOOTER}\n",
        id = complaint.id,
        title = complaint.title,
        priority = complaint.priority.as_str().to_uppercase(),
        category = complaint.category(),
        description = complaint.description,
        address = complaint.address,
        submitter = submitter_name(complaint),
        days = complaint.age_days(now),
    );

    OutgoingMessage {
        recipient,
        subject: format!("URGENT: Complaint Escalation Required - {}", complaint.title),
        body,
    }
}

pub fn citizen_notice(complaint: &Complaint, email: &str) -> OutgoingMessage {
    let name = complaint
        .created_by
        .as_ref()
        .and_then(|c| c.name.as_deref())
        .unwrap_or("Valued Citizen");

    let body = format!(
        "Your Complaint Has Been Escalated\n\n\
         Dear {name},\n\n\
         Your complaint has been escalated to higher officials for immediate attention.\n\n\
         Complaint Details:\n\
         - ID: {id}\n\
         - Title: {title}\n\
         - Priority: {priority}\n\
         - Category: {category}\n\
         - Submitted on: {submitted}\n\n\
         It exceeded the standard resolution time for {raw_priority} priority complaints.\n\
         We are working to resolve it as quickly as possible.\n\n\
         Government Complaint Management Team\n\n\
         {FOOTER}\n",
        id = complaint.id,
        title = complaint.title,
        priority = complaint.priority.as_str().to_uppercase(),
        category = complaint.category(),
        submitted = complaint.created_at.format("%Y-%m-%d"),
        raw_priority = complaint.priority,
    );

    OutgoingMessage {
        recipient: Recipient::Address(email.to_string()),
        subject: format!("Your Complaint Has Been Escalated - {}", complaint.title),
        body,
    }
}

pub fn staff_reminder(
    complaint: &Complaint,
    email: &str,
    days_until_escalation: i64,
    now: DateTime<Utc>,
) -> OutgoingMessage {
    let name = complaint
        .assigned_to
        .as_ref()
        .and_then(|c| c.name.as_deref())
        .unwrap_or("Staff Member");

    let body = format!(
        "Complaint Resolution Reminder\n\n\
         Dear {name},\n\n\
         A complaint assigned to you needs attention.\n\n\
         Complaint Details:\n\
         - ID: {id}\n\
         - Title: {title}\n\
         - Priority: {priority}\n\
         - Category: {category}\n\
         - Days open: {days} days\n\n\
         {left} day(s) until escalation.\n\n\
         It will be escalated to higher officials in {left} day(s) if not resolved.\n\
         Please review it, move it to in-progress and add progress notes.\n\n\
         {FOOTER}\n",
        id = complaint.id,
        title = complaint.title,
        priority = complaint.priority.as_str().to_uppercase(),
        category = complaint.category(),
        days = complaint.age_days(now),
        left = days_until_escalation,
    );

    OutgoingMessage {
        recipient: Recipient::Address(email.to_string()),
        subject: format!("URGENT: Complaint Resolution Reminder - {}", complaint.title),
        body,
    }
}

pub fn test_message(address: &str, now: DateTime<Utc>) -> OutgoingMessage {
    OutgoingMessage {
        recipient: Recipient::Address(address.to_string()),
        subject: "Test Email - Government Complaint System".to_string(),
        body: format!(
            "Email Service Test\n\n\
             To: {address}\n\
             Timestamp: {}\n\n\
             If you received this, escalation notifications can be delivered.\n\n\
             {FOOTER}\n",
            now.to_rfc3339()
        ),
    }
}
