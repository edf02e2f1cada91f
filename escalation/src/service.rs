//! Escalation service facade
//!
//! The surface a controller layer calls: manual sweep, per-complaint status,
//! statistics, manual escalation and staff reminders. Internal failures are
//! logged here and reported as [`ServiceError::OperationFailed`].

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::config::{EscalationConfig, EscalationLimits};
use crate::executor::{EscalationError, EscalationExecutor, EscalationOutcome};
use crate::model::{Complaint, ComplaintStatus, Priority};
use crate::notify::{NotificationGateway, SendOutcome, SharedTransport};
use crate::policy::{self, EscalationStatus};
use crate::scheduler::EscalationScheduler;
use crate::store::{SharedComplaintStore, StoreResult};
use crate::sweep::{SweepCoordinator, SweepError, SweepResult};

/// Errors surfaced to callers of the service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Complaint not found: {0}")]
    NotFound(String),

    #[error("Complaint {id} cannot be escalated from status {status}")]
    NotEscalatable { id: String, status: ComplaintStatus },

    #[error("An escalation sweep is already in progress")]
    SweepInProgress,

    #[error("Escalation operation failed")]
    OperationFailed,
}

/// Active complaint counts per priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityCounts {
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

/// Escalation statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalationStats {
    pub total: u64,
    pub escalated: u64,
    pub resolved: u64,
    /// Every active complaint, pending or in progress
    pub pending: u64,
    pub by_priority: PriorityCounts,
    pub escalation_limits: EscalationLimits,
}

fn internal(operation: &'static str, e: &dyn std::fmt::Display) -> ServiceError {
    error!(operation, error = %e, "Escalation operation failed");
    ServiceError::OperationFailed
}

/// Wires the store, gateway, executor and sweep coordinator together.
pub struct EscalationService {
    store: SharedComplaintStore,
    gateway: Arc<NotificationGateway>,
    executor: Arc<EscalationExecutor>,
    coordinator: Arc<SweepCoordinator>,
    limits: EscalationLimits,
}

impl EscalationService {
    pub fn new(
        config: &EscalationConfig,
        store: SharedComplaintStore,
        transport: SharedTransport,
    ) -> Self {
        let gateway = NotificationGateway::new(transport, config.admin_recipient.clone()).shared();
        let executor = Arc::new(EscalationExecutor::new(
            store.clone(),
            gateway.clone(),
            config.limits,
            config.notify_timeout(),
        ));
        let coordinator = SweepCoordinator::new(store.clone(), executor.clone()).shared();
        Self {
            store,
            gateway,
            executor,
            coordinator,
            limits: config.limits,
        }
    }

    /// Create a shared reference to this service
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn coordinator(&self) -> &Arc<SweepCoordinator> {
        &self.coordinator
    }

    /// A scheduler driving this service's coordinator.
    pub fn scheduler(&self) -> EscalationScheduler {
        EscalationScheduler::new(self.coordinator.clone())
    }

    /// One ad hoc sweep over the active complaints.
    pub async fn run_sweep(&self) -> Result<SweepResult, ServiceError> {
        self.coordinator.run().await.map_err(|e| match e {
            SweepError::InProgress => ServiceError::SweepInProgress,
            other => internal("run_sweep", &other),
        })
    }

    /// Escalation status of one complaint. Read-only.
    pub async fn status(&self, complaint_id: &str) -> Result<EscalationStatus, ServiceError> {
        let complaint = self.load(complaint_id).await?;
        Ok(policy::status_of(&complaint, &self.limits, Utc::now()))
    }

    pub async fn stats(&self) -> Result<EscalationStats, ServiceError> {
        self.collect_stats()
            .await
            .map_err(|e| internal("stats", &e))
    }

    /// Escalate one complaint on request, regardless of its age.
    pub async fn escalate_by_id(&self, complaint_id: &str) -> Result<EscalationOutcome, ServiceError> {
        let complaint = self.load(complaint_id).await?;
        self.executor
            .escalate(complaint)
            .await
            .map_err(|e| match e {
                EscalationError::InvalidTransition { id, from } => {
                    ServiceError::NotEscalatable { id, status: from }
                }
                other => internal("escalate_by_id", &other),
            })
    }

    /// Remind the assigned staff member how long they have left.
    pub async fn remind_assignee(&self, complaint_id: &str) -> Result<SendOutcome, ServiceError> {
        let complaint = self.load(complaint_id).await?;
        if complaint.status.is_terminal() {
            return Err(ServiceError::NotEscalatable {
                id: complaint.id,
                status: complaint.status,
            });
        }
        let now = Utc::now();
        let days_left = policy::days_until_escalation(&complaint, &self.limits, now);
        self.gateway
            .staff_reminder(&complaint, days_left, now)
            .await
            .map_err(|e| internal("remind_assignee", &e))
    }

    /// Probe the notification transport.
    pub async fn send_test_message(&self, address: &str) -> Result<SendOutcome, ServiceError> {
        self.gateway
            .test_message(address, Utc::now())
            .await
            .map_err(|e| internal("send_test_message", &e))
    }

    async fn load(&self, complaint_id: &str) -> Result<Complaint, ServiceError> {
        self.store
            .find_by_id(complaint_id)
            .await
            .map_err(|e| internal("load", &e))?
            .ok_or_else(|| ServiceError::NotFound(complaint_id.to_string()))
    }

    async fn collect_stats(&self) -> StoreResult<EscalationStats> {
        let store = &self.store;
        let pending = store.count_by_status(ComplaintStatus::Pending).await?
            + store.count_by_status(ComplaintStatus::InProgress).await?;
        Ok(EscalationStats {
            total: store.count_all().await?,
            escalated: store.count_by_status(ComplaintStatus::Escalated).await?,
            resolved: store.count_by_status(ComplaintStatus::Resolved).await?,
            pending,
            by_priority: PriorityCounts {
                high: store.count_by_priority_active(&Priority::High).await?,
                medium: store.count_by_priority_active(&Priority::Medium).await?,
                low: store.count_by_priority_active(&Priority::Low).await?,
            },
            escalation_limits: self.limits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Contact;
    use crate::notify::{Delivery, MockNotificationTransport, Recipient};
    use crate::store::MemoryStore;
    use chrono::Duration;

    fn config() -> EscalationConfig {
        EscalationConfig {
            limits: EscalationLimits::default(),
            check_interval_minutes: 60,
            admin_recipient: "Higher Official".to_string(),
            notify_timeout_secs: 5,
            notifier: Default::default(),
        }
    }

    fn seeded() -> Arc<MemoryStore> {
        let now = Utc::now();
        Arc::new(MemoryStore::with_complaints([
            Complaint::new("h1", "Collapsed wall", Priority::High)
                .with_created_at(now - Duration::days(4)),
            Complaint::new("m1", "Broken bench", Priority::Medium)
                .with_created_at(now - Duration::days(2))
                .with_status(ComplaintStatus::InProgress)
                .with_assigned_to(Contact::new("Officer P", "p@city.gov")),
            Complaint::new("l1", "Faded sign", Priority::Low)
                .with_status(ComplaintStatus::Resolved),
            Complaint::new("h2", "Open manhole", Priority::High)
                .with_status(ComplaintStatus::Escalated),
        ]))
    }

    fn accepting() -> MockNotificationTransport {
        let mut mock = MockNotificationTransport::new();
        mock.expect_send().returning(|_| Ok(Delivery::accepted("m")));
        mock
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let service = EscalationService::new(&config(), seeded(), Arc::new(accepting()));
        let stats = service.stats().await.unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.escalated, 1);
        assert_eq!(stats.resolved, 1);
        assert_eq!(stats.pending, 2);
        assert_eq!(
            stats.by_priority,
            PriorityCounts {
                high: 1,
                medium: 1,
                low: 0
            }
        );
        assert_eq!(stats.escalation_limits, EscalationLimits::default());
    }

    #[tokio::test]
    async fn test_status_is_read_only() {
        let store = seeded();
        let service = EscalationService::new(&config(), store.clone(), Arc::new(accepting()));
        let status = service.status("h1").await.unwrap();
        assert!(status.should_escalate);
        assert_eq!(status.days_since_creation, 4);
        assert_eq!(status.escalation_limit, 3);
        assert_eq!(
            store.get("h1").unwrap().unwrap().status,
            ComplaintStatus::Pending
        );
    }

    #[tokio::test]
    async fn test_unknown_complaint() {
        let service = EscalationService::new(&config(), seeded(), Arc::new(accepting()));
        assert!(matches!(
            service.status("nope").await,
            Err(ServiceError::NotFound(id)) if id == "nope"
        ));
    }

    #[tokio::test]
    async fn test_manual_sweep_then_stats() {
        let service = EscalationService::new(&config(), seeded(), Arc::new(accepting()));
        let result = service.run_sweep().await.unwrap();
        assert_eq!(result.escalated_count, 1);
        assert_eq!(result.skipped_count, 1);
        assert_eq!(result.total_checked, 2);
        assert_eq!(service.stats().await.unwrap().escalated, 2);
    }

    #[tokio::test]
    async fn test_escalate_by_id_rejections() {
        let service = EscalationService::new(&config(), seeded(), Arc::new(accepting()));
        assert!(service.escalate_by_id("h2").await.unwrap().already_escalated());
        assert!(matches!(
            service.escalate_by_id("l1").await,
            Err(ServiceError::NotEscalatable {
                status: ComplaintStatus::Resolved,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_remind_assignee_reports_days_left() {
        let mut mock = MockNotificationTransport::new();
        mock.expect_send()
            .withf(|m| {
                m.recipient == Recipient::Address("p@city.gov".to_string())
                    && m.body.contains("5 day(s) until escalation")
            })
            .times(1)
            .returning(|_| Ok(Delivery::accepted("r-1")));

        let service = EscalationService::new(&config(), seeded(), Arc::new(mock));
        let outcome = service.remind_assignee("m1").await.unwrap();
        assert!(outcome.success());
    }

    #[tokio::test]
    async fn test_remind_without_assignee() {
        let service = EscalationService::new(&config(), seeded(), Arc::new(accepting()));
        let outcome = service.remind_assignee("h1").await.unwrap();
        assert!(!outcome.success());
    }
}
