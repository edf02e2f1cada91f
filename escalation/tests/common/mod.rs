//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use complaint_escalation::{
    Complaint, ComplaintStatus, ComplaintStore, Contact, Delivery, EscalationExecutor,
    EscalationLimits, MemoryStore, NotificationGateway, NotificationTransport, NotifyError,
    OutgoingMessage, Priority, Recipient, StoreError, StoreResult, SweepCoordinator,
};
use tokio::sync::Notify;

pub const ADMIN: &str = "Higher Official";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("complaint_escalation=debug")
        .with_test_writer()
        .try_init();
}

/// Complaint created `days` ago.
pub fn aged(id: &str, priority: Priority, days: i64) -> Complaint {
    Complaint::new(id, format!("Complaint {}", id), priority)
        .with_created_at(Utc::now() - chrono::Duration::days(days))
}

pub fn with_citizen(complaint: Complaint) -> Complaint {
    let email = format!("{}@citizens.example", complaint.id);
    complaint.with_created_by(Contact::new("Citizen", email))
}

/// Transport that records every message and can be told to misbehave.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<OutgoingMessage>>,
    fail_admin: bool,
    hang: bool,
    pause_first_alert: Option<AlertPause>,
}

/// Holds the first administrator alert until released.
pub struct AlertPause {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
    armed: AtomicBool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Administrator alerts fail at the transport level.
    pub fn failing_admin() -> Self {
        Self {
            fail_admin: true,
            ..Self::default()
        }
    }

    /// Every send blocks forever.
    pub fn hanging() -> Self {
        Self {
            hang: true,
            ..Self::default()
        }
    }

    /// The first administrator alert signals `entered` and waits on `release`.
    pub fn pausing_first_alert(entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            pause_first_alert: Some(AlertPause {
                entered,
                release,
                armed: AtomicBool::new(true),
            }),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to_admin(&self) -> usize {
        self.sent()
            .iter()
            .filter(|m| m.recipient == Recipient::Administrator)
            .count()
    }
}

#[async_trait]
impl NotificationTransport for RecordingTransport {
    async fn send(&self, message: &OutgoingMessage) -> Result<Delivery, NotifyError> {
        let n = {
            let mut sent = self.sent.lock().unwrap();
            sent.push(message.clone());
            sent.len()
        };
        if self.hang {
            std::future::pending::<()>().await;
        }
        if let Some(pause) = &self.pause_first_alert {
            if message.recipient == Recipient::Administrator
                && pause.armed.swap(false, Ordering::SeqCst)
            {
                pause.entered.notify_one();
                pause.release.notified().await;
            }
        }
        if self.fail_admin && message.recipient == Recipient::Administrator {
            return Err(NotifyError::Request("connection reset".to_string()));
        }
        Ok(Delivery::accepted(format!("msg-{}", n)))
    }
}

/// Memory store with injectable faults and call counters.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    failing_saves: HashSet<String>,
    fail_loads: bool,
    panic_on_first_load: AtomicBool,
    gate: Option<Arc<Notify>>,
    pub find_active_calls: AtomicUsize,
    pub save_calls: AtomicUsize,
}

impl FaultyStore {
    pub fn new(complaints: impl IntoIterator<Item = Complaint>) -> Self {
        Self {
            inner: MemoryStore::with_complaints(complaints),
            ..Self::default()
        }
    }

    pub fn fail_save_for(mut self, id: &str) -> Self {
        self.failing_saves.insert(id.to_string());
        self
    }

    pub fn fail_loads(mut self) -> Self {
        self.fail_loads = true;
        self
    }

    pub fn panic_on_first_load(self) -> Self {
        self.panic_on_first_load.store(true, Ordering::SeqCst);
        self
    }

    /// `find_active` waits for a permit on `gate` before returning.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn loads(&self) -> usize {
        self.find_active_calls.load(Ordering::SeqCst)
    }

    pub fn saves(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    pub fn status_of(&self, id: &str) -> Option<ComplaintStatus> {
        self.inner.get(id).unwrap().map(|c| c.status)
    }
}

#[async_trait]
impl ComplaintStore for FaultyStore {
    async fn find_active(&self) -> StoreResult<Vec<Complaint>> {
        self.find_active_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_first_load.swap(false, Ordering::SeqCst) {
            panic!("corrupt record encountered while loading");
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if self.fail_loads {
            return Err(StoreError::Unavailable("database offline".to_string()));
        }
        self.inner.find_active().await
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Complaint>> {
        self.inner.find_by_id(id).await
    }

    async fn save(&self, complaint: &Complaint) -> StoreResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_saves.contains(&complaint.id) {
            return Err(StoreError::WriteFailed {
                id: complaint.id.clone(),
                reason: "document locked".to_string(),
            });
        }
        self.inner.save(complaint).await
    }

    async fn count_all(&self) -> StoreResult<u64> {
        self.inner.count_all().await
    }

    async fn count_by_status(&self, status: ComplaintStatus) -> StoreResult<u64> {
        self.inner.count_by_status(status).await
    }

    async fn count_by_priority_active(&self, priority: &Priority) -> StoreResult<u64> {
        self.inner.count_by_priority_active(priority).await
    }
}

/// Executor and coordinator over the given store and transport.
pub fn wire(
    store: Arc<FaultyStore>,
    transport: Arc<RecordingTransport>,
) -> (Arc<EscalationExecutor>, Arc<SweepCoordinator>) {
    let gateway = NotificationGateway::new(transport, ADMIN).shared();
    let executor = Arc::new(EscalationExecutor::new(
        store.clone(),
        gateway,
        EscalationLimits::default(),
        Duration::from_secs(2),
    ));
    let coordinator = SweepCoordinator::new(store, executor.clone()).shared();
    (executor, coordinator)
}
