// Refresh scheduler - periodic re-evaluation of live timers
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Stop,
}

/// Work performed on every scheduler tick.
#[async_trait]
pub trait RefreshTask: Send + 'static {
    async fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome;
}

/// Runs a [`RefreshTask`] on a fixed interval until the task asks to stop
/// or [`RefreshScheduler::stop`] is called. The first tick fires immediately.
#[derive(Clone)]
pub struct RefreshScheduler {
    interval: Duration,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl RefreshScheduler {
    /// `interval` is clamped to the supported 1-30 second range.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: interval.clamp(MIN_REFRESH_INTERVAL, MAX_REFRESH_INTERVAL),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.ticker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start ticking `task`. A task already running on this scheduler is replaced.
    pub fn start<T: RefreshTask>(&self, mut task: T) {
        let period = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if task.tick(Utc::now()).await == TickOutcome::Stop {
                    tracing::debug!("Refresh task finished");
                    break;
                }
            }
        });

        if let Some(previous) = self.slot().replace(handle) {
            previous.abort();
        }
    }

    /// Abort the running task, if any. Safe to call from `Drop`.
    pub fn stop(&self) {
        if let Some(handle) = self.slot().take() {
            handle.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.slot()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}
