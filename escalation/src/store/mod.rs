//! Record store seam
//!
//! The escalation subsystem depends only on [`ComplaintStore`]; the storage
//! technology behind it is the adapter's concern.

pub mod memory;

pub use memory::MemoryStore;

use std::sync::Arc;

use async_trait::async_trait;

use crate::model::{Complaint, ComplaintStatus, Priority};

/// Error type for record store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Write rejected for complaint {id}: {reason}")]
    WriteFailed { id: String, reason: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Lock poisoned")]
    LockPoisoned,
}

/// Result type for record store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Shared reference to a record store
pub type SharedComplaintStore = Arc<dyn ComplaintStore>;

/// Persistence collaborator for complaint records.
#[async_trait]
pub trait ComplaintStore: Send + Sync {
    /// Complaints whose status is neither resolved nor escalated.
    async fn find_active(&self) -> StoreResult<Vec<Complaint>>;

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Complaint>>;

    /// Atomic full-record upsert.
    async fn save(&self, complaint: &Complaint) -> StoreResult<()>;

    async fn count_all(&self) -> StoreResult<u64>;

    async fn count_by_status(&self, status: ComplaintStatus) -> StoreResult<u64>;

    /// Active complaints of the given priority.
    async fn count_by_priority_active(&self, priority: &Priority) -> StoreResult<u64>;
}
