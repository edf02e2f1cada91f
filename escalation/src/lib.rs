//! Complaint Escalation Library
//!
//! Promotes overdue citizen complaints to `escalated` and notifies the
//! parties involved.
//!
//! # Components
//!
//! - `policy`: pure overdue check against per-priority day limits
//! - `notify`: notification gateway and the form-submission transport
//! - `executor`: applies one escalation (persist, then notify)
//! - `sweep`: one sequential pass over all active complaints
//! - `scheduler`: immediate-then-periodic sweep timer with start/stop/status
//! - `service`: manual sweep, status and statistics queries for controllers
//!
//! # Flow
//!
//! ```text
//! Scheduler tick ─► SweepCoordinator::run
//!                      ├─ store.find_active()
//!                      └─ per complaint: policy::evaluate ─► EscalationExecutor
//!                                                              ├─ store.save()
//!                                                              └─ NotificationGateway
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod executor;
pub mod model;
pub mod notify;
pub mod policy;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod sweep;

// Re-export configuration types
pub use config::{ConfigError, EscalationConfig, EscalationLimits, NotifierConfig};

// Re-export record types
pub use model::{Complaint, ComplaintStatus, Contact, EscalationRecord, Priority};

// Re-export policy types
pub use policy::{days_until_escalation, evaluate, EscalationCheck, EscalationStatus};

// Re-export notification types
pub use notify::{
    Delivery, NotificationGateway, NotificationTransport, NotifyError, OutgoingMessage,
    Recipient, SendOutcome, SharedTransport, Web3FormsTransport,
};

// Re-export store types
pub use store::{ComplaintStore, MemoryStore, SharedComplaintStore, StoreError, StoreResult};

// Re-export escalation machinery
pub use executor::{EscalationError, EscalationExecutor, EscalationOutcome, EscalationReport};
pub use scheduler::{EscalationScheduler, SchedulerError, SchedulerStatus, StartOutcome};
pub use service::{EscalationService, EscalationStats, PriorityCounts, ServiceError};
pub use sweep::{SweepCoordinator, SweepError, SweepResult};
