//! Scheduler — periodic sweep trigger
//!
//! ```text
//! stopped ──start(n)──► running ──stop()──► stopped
//!             │
//!             ├─ sweep immediately
//!             └─ sweep every n minutes
//! ```
//!
//! The timer is a tokio task owned by the scheduler. `start` while running
//! leaves the existing timer alone. `stop` only prevents future ticks; a
//! sweep already in flight finishes. A tick that errors or panics is logged
//! and the next tick still fires.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::sweep::{SweepCoordinator, SweepError};

/// Interval used until `start` is first called.
pub const DEFAULT_CHECK_INTERVAL_MINUTES: u64 = 60;

/// Longest accepted interval: one year.
pub const MAX_CHECK_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Sweep interval must be between 1 and {max} minutes, got {0}", max = MAX_CHECK_INTERVAL_MINUTES)]
    InvalidInterval(u64),
}

fn sweep_period(interval_minutes: u64) -> Result<Duration, SchedulerError> {
    if !(1..=MAX_CHECK_INTERVAL_MINUTES).contains(&interval_minutes) {
        return Err(SchedulerError::InvalidInterval(interval_minutes));
    }
    interval_minutes
        .checked_mul(60)
        .map(Duration::from_secs)
        .ok_or(SchedulerError::InvalidInterval(interval_minutes))
}

/// What `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

/// Snapshot of the scheduler for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchedulerStatus {
    pub is_running: bool,
    /// Minutes between sweeps
    pub check_interval: u64,
    pub next_check: Option<DateTime<Utc>>,
}

struct ActiveTimer {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct SchedulerState {
    timer: Option<ActiveTimer>,
    check_interval_minutes: u64,
}

/// Owns the periodic sweep task.
pub struct EscalationScheduler {
    coordinator: Arc<SweepCoordinator>,
    state: Mutex<SchedulerState>,
}

impl EscalationScheduler {
    pub fn new(coordinator: Arc<SweepCoordinator>) -> Self {
        Self {
            coordinator,
            state: Mutex::new(SchedulerState {
                timer: None,
                check_interval_minutes: DEFAULT_CHECK_INTERVAL_MINUTES,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        // State is two plain fields; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Start sweeping every `interval_minutes`, beginning now.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self, interval_minutes: u64) -> Result<StartOutcome, SchedulerError> {
        let period = sweep_period(interval_minutes)?;

        let mut state = self.lock();
        if state.timer.is_some() {
            info!(
                interval_minutes = state.check_interval_minutes,
                "Escalation scheduler is already running"
            );
            return Ok(StartOutcome::AlreadyRunning);
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run_timer(
            self.coordinator.clone(),
            period,
            cancel.clone(),
        ));

        state.check_interval_minutes = interval_minutes;
        state.timer = Some(ActiveTimer { cancel, handle });
        info!(interval_minutes, "Escalation scheduler started");
        Ok(StartOutcome::Started)
    }

    /// Stop future ticks. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let timer = self.lock().timer.take();
        match timer {
            Some(timer) => {
                timer.cancel.cancel();
                info!("Escalation scheduler stopped");
                true
            }
            None => {
                debug!("Escalation scheduler already stopped");
                false
            }
        }
    }

    /// Stop and wait for an in-flight sweep to finish.
    pub async fn shutdown(&self) {
        let timer = self.lock().timer.take();
        if let Some(timer) = timer {
            timer.cancel.cancel();
            if let Err(e) = timer.handle.await {
                warn!(error = %e, "Escalation timer task ended abnormally");
            }
            info!("Escalation scheduler shut down");
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().timer.is_some()
    }

    pub fn status(&self) -> SchedulerStatus {
        let state = self.lock();
        let is_running = state.timer.is_some();
        let minutes = state.check_interval_minutes;
        SchedulerStatus {
            is_running,
            check_interval: minutes,
            next_check: is_running
                .then(|| {
                    i64::try_from(minutes)
                        .ok()
                        .and_then(chrono::Duration::try_minutes)
                        .and_then(|step| Utc::now().checked_add_signed(step))
                })
                .flatten(),
        }
    }
}

impl Drop for EscalationScheduler {
    fn drop(&mut self) {
        if let Some(timer) = self.lock().timer.take() {
            timer.cancel.cancel();
        }
    }
}

async fn run_timer(coordinator: Arc<SweepCoordinator>, period: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut trigger = "initial";

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        run_tick(&coordinator, trigger).await;
        trigger = "periodic";
    }

    debug!("Escalation timer exited");
}

async fn run_tick(coordinator: &SweepCoordinator, trigger: &'static str) {
    info!(trigger, "Running escalation check");
    match AssertUnwindSafe(coordinator.run()).catch_unwind().await {
        Ok(Ok(result)) => debug!(
            trigger,
            escalated = result.escalated_count,
            skipped = result.skipped_count,
            errors = result.error_count,
            "Scheduled escalation check finished"
        ),
        Ok(Err(SweepError::InProgress)) => {
            warn!(trigger, "Skipping scheduled check, a sweep is already in progress")
        }
        Ok(Err(e)) => error!(trigger, error = %e, "Scheduled escalation check failed"),
        Err(_) => error!(trigger, "Scheduled escalation check panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EscalationLimits;
    use crate::executor::EscalationExecutor;
    use crate::notify::{MockNotificationTransport, NotificationGateway};
    use crate::store::MemoryStore;

    fn scheduler() -> EscalationScheduler {
        let store = Arc::new(MemoryStore::new());
        let gateway =
            NotificationGateway::new(Arc::new(MockNotificationTransport::new()), "admin").shared();
        let executor = Arc::new(EscalationExecutor::new(
            store.clone(),
            gateway,
            EscalationLimits::default(),
            Duration::from_secs(1),
        ));
        EscalationScheduler::new(SweepCoordinator::new(store, executor).shared())
    }

    #[tokio::test]
    async fn test_status_when_stopped() {
        let scheduler = scheduler();
        assert_eq!(
            scheduler.status(),
            SchedulerStatus {
                is_running: false,
                check_interval: DEFAULT_CHECK_INTERVAL_MINUTES,
                next_check: None,
            }
        );
    }

    #[tokio::test]
    async fn test_zero_interval_rejected() {
        let scheduler = scheduler();
        assert!(matches!(
            scheduler.start(0),
            Err(SchedulerError::InvalidInterval(0))
        ));
        assert!(!scheduler.is_running());
    }

    #[tokio::test]
    async fn test_oversized_interval_rejected() {
        let scheduler = scheduler();
        for minutes in [MAX_CHECK_INTERVAL_MINUTES + 1, 200_000_000_000, u64::MAX] {
            assert!(matches!(
                scheduler.start(minutes),
                Err(SchedulerError::InvalidInterval(m)) if m == minutes
            ));
        }
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.status().next_check, None);
    }

    #[tokio::test]
    async fn test_longest_interval_reports_next_check() {
        let scheduler = scheduler();
        assert_eq!(
            scheduler.start(MAX_CHECK_INTERVAL_MINUTES).unwrap(),
            StartOutcome::Started
        );
        let status = scheduler.status();
        assert_eq!(status.check_interval, MAX_CHECK_INTERVAL_MINUTES);
        assert!(status.next_check.unwrap() > Utc::now() + chrono::Duration::days(364));
        scheduler.stop();
    }

    #[test]
    fn test_sweep_period() {
        assert_eq!(sweep_period(1).unwrap(), Duration::from_secs(60));
        assert_eq!(sweep_period(60).unwrap(), Duration::from_secs(3600));
        assert!(sweep_period(0).is_err());
        assert!(sweep_period(u64::MAX).is_err());
    }

    #[tokio::test]
    async fn test_start_stop_cycle() {
        let scheduler = scheduler();
        assert_eq!(scheduler.start(15).unwrap(), StartOutcome::Started);
        assert_eq!(scheduler.start(30).unwrap(), StartOutcome::AlreadyRunning);

        let before = Utc::now();
        let status = scheduler.status();
        assert!(status.is_running);
        assert_eq!(status.check_interval, 15, "second start must not reset interval");
        let next = status.next_check.unwrap();
        assert!(next >= before + chrono::Duration::minutes(15));

        assert!(scheduler.stop());
        assert!(!scheduler.stop(), "stop is safe when already stopped");
        let status = scheduler.status();
        assert!(!status.is_running);
        assert_eq!(status.check_interval, 15);
        assert_eq!(status.next_check, None);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let scheduler = scheduler();
        scheduler.start(5).unwrap();
        scheduler.shutdown().await;
        assert!(!scheduler.is_running());
        assert_eq!(scheduler.start(10).unwrap(), StartOutcome::Started);
        assert_eq!(scheduler.status().check_interval, 10);
        scheduler.stop();
    }
}
