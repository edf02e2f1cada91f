//! In-memory record store
//!
//! Backs the daemon when no database is wired in, and the tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{ComplaintStore, SharedComplaintStore, StoreError, StoreResult};
use crate::model::{Complaint, ComplaintStatus, Priority};

/// Complaint records held in a process-local map keyed by id.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<HashMap<String, Complaint>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_complaints(complaints: impl IntoIterator<Item = Complaint>) -> Self {
        let records = complaints
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Load a JSON array of complaints.
    pub fn from_json_file(path: &Path) -> StoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let complaints: Vec<Complaint> = serde_json::from_str(&content)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Self::with_complaints(complaints))
    }

    /// Create a shared reference to this store
    pub fn shared(self) -> SharedComplaintStore {
        Arc::new(self)
    }

    pub fn insert(&self, complaint: Complaint) -> StoreResult<()> {
        let mut records = self.records.write().map_err(|_| StoreError::LockPoisoned)?;
        records.insert(complaint.id.clone(), complaint);
        Ok(())
    }

    pub fn get(&self, id: &str) -> StoreResult<Option<Complaint>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.get(id).cloned())
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn count_where(&self, pred: impl Fn(&Complaint) -> bool) -> StoreResult<u64> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(records.values().filter(|c| pred(c)).count() as u64)
    }
}

#[async_trait]
impl ComplaintStore for MemoryStore {
    async fn find_active(&self) -> StoreResult<Vec<Complaint>> {
        let records = self.records.read().map_err(|_| StoreError::LockPoisoned)?;
        let mut active: Vec<Complaint> = records
            .values()
            .filter(|c| !c.status.is_terminal())
            .cloned()
            .collect();
        // Oldest first so a sweep's log reads in escalation order.
        active.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(active)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Complaint>> {
        self.get(id)
    }

    async fn save(&self, complaint: &Complaint) -> StoreResult<()> {
        self.insert(complaint.clone())
    }

    async fn count_all(&self) -> StoreResult<u64> {
        self.count_where(|_| true)
    }

    async fn count_by_status(&self, status: ComplaintStatus) -> StoreResult<u64> {
        self.count_where(|c| c.status == status)
    }

    async fn count_by_priority_active(&self, priority: &Priority) -> StoreResult<u64> {
        self.count_where(|c| &c.priority == priority && !c.status.is_terminal())
    }
}
