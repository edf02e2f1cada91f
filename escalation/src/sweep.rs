//! Sweep Coordinator — one pass over the active complaints
//!
//! Evaluates every active complaint against the policy and escalates the
//! overdue ones, strictly one at a time. A failure on one record is counted
//! and logged; the pass always continues to the next record.
//!
//! Only one sweep runs at a time per coordinator. A second caller arriving
//! while a sweep is in flight gets [`SweepError::InProgress`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::executor::{EscalationExecutor, EscalationOutcome};
use crate::model::Complaint;
use crate::policy;
use crate::store::{SharedComplaintStore, StoreError};

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepResult {
    pub escalated_count: u64,
    pub skipped_count: u64,
    pub error_count: u64,
    pub total_checked: u64,
}

/// Errors that stop a sweep before it iterates
#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("A sweep is already in progress")]
    InProgress,

    #[error("Failed to load active complaints: {0}")]
    Load(#[from] StoreError),
}

/// Clears the in-progress flag on every exit path, including unwinding.
struct SweepGuard<'a>(&'a AtomicBool);

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SweepError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| Self(flag))
            .map_err(|_| SweepError::InProgress)
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives policy evaluation and escalation across a batch of complaints.
pub struct SweepCoordinator {
    store: SharedComplaintStore,
    executor: Arc<EscalationExecutor>,
    in_progress: AtomicBool,
}

impl SweepCoordinator {
    pub fn new(store: SharedComplaintStore, executor: Arc<EscalationExecutor>) -> Self {
        Self {
            store,
            executor,
            in_progress: AtomicBool::new(false),
        }
    }

    /// Create a shared reference to this coordinator
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn executor(&self) -> &Arc<EscalationExecutor> {
        &self.executor
    }

    /// Whether a sweep is currently running.
    pub fn is_sweeping(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// Load the active complaints from the store and sweep them.
    pub async fn run(&self) -> Result<SweepResult, SweepError> {
        let _guard = SweepGuard::acquire(&self.in_progress)?;
        let complaints = self.store.find_active().await?;
        Ok(self.process(complaints, Utc::now()).await)
    }

    /// Sweep an already-loaded batch.
    pub async fn sweep(&self, complaints: Vec<Complaint>) -> Result<SweepResult, SweepError> {
        self.sweep_at(complaints, Utc::now()).await
    }

    /// Sweep an already-loaded batch as of `now`.
    pub async fn sweep_at(
        &self,
        complaints: Vec<Complaint>,
        now: DateTime<Utc>,
    ) -> Result<SweepResult, SweepError> {
        let _guard = SweepGuard::acquire(&self.in_progress)?;
        Ok(self.process(complaints, now).await)
    }

    async fn process(&self, complaints: Vec<Complaint>, now: DateTime<Utc>) -> SweepResult {
        let mut result = SweepResult {
            total_checked: complaints.len() as u64,
            ..Default::default()
        };
        info!(active = result.total_checked, "Checking for overdue complaints");

        for complaint in complaints {
            let check = policy::evaluate(&complaint, self.executor.limits(), now);
            if !check.needs_escalation {
                result.skipped_count += 1;
                continue;
            }

            info!(
                complaint_id = %complaint.id,
                title = %complaint.title,
                priority = %complaint.priority,
                days_overdue = check.days_overdue.unwrap_or(0),
                "Escalating complaint"
            );

            let id = complaint.id.clone();
            match self.executor.escalate_at(complaint, now).await {
                Ok(EscalationOutcome::Escalated(_)) => result.escalated_count += 1,
                Ok(EscalationOutcome::AlreadyEscalated { .. }) => result.skipped_count += 1,
                Err(e) => {
                    error!(complaint_id = %id, error = %e, "Failed to process complaint");
                    result.error_count += 1;
                }
            }
        }

        if result.escalated_count > 0 || result.error_count > 0 {
            info!(
                escalated = result.escalated_count,
                skipped = result.skipped_count,
                errors = result.error_count,
                "Escalation check complete"
            );
        } else {
            info!(checked = result.total_checked, "No complaints need escalation");
        }
        if result.error_count > 0 {
            warn!(errors = result.error_count, "Some complaints could not be escalated");
        }

        result
    }
}
