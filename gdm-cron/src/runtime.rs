use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::error::CronError;

/// Work performed on every tick. Returns how many items it changed.
#[async_trait]
pub trait ScheduleHook: Send + Sync + 'static {
    async fn run(&self, now: DateTime<Utc>) -> Result<usize, String>;
}

/// Record of one hook invocation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CronRun {
    pub at: DateTime<Utc>,
    pub changed: usize,
    pub error: Option<String>,
}

/// Keeps the most recent runs only.
const HISTORY_LIMIT: usize = 100;

/// Runtime that ticks immediately and then on every interval until shut down.
pub struct CronRuntime {
    runs: Arc<RwLock<Vec<CronRun>>>,
    notify: Arc<Notify>,
    shutting_down: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Default for CronRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl CronRuntime {
    pub fn new() -> Self {
        Self {
            runs: Arc::new(RwLock::new(Vec::new())),
            notify: Arc::new(Notify::new()),
            shutting_down: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    pub fn start<H>(&mut self, hook: Arc<H>, interval: Duration) -> Result<(), CronError>
    where
        H: ScheduleHook,
    {
        if self.worker.is_some() {
            return Err(CronError::AlreadyRunning);
        }
        if interval.is_zero() {
            return Err(CronError::InvalidInterval);
        }

        let runs = self.runs.clone();
        let notify = self.notify.clone();
        let shutting_down = self.shutting_down.clone();

        info!(interval_secs = interval.as_secs(), "starting cron runtime");
        self.worker = Some(tokio::spawn(async move {
            tick_loop(hook, interval, runs, notify, shutting_down).await;
        }));
        Ok(())
    }

    /// Completed runs, oldest first.
    pub fn runs(&self) -> Vec<CronRun> {
        self.runs.read().clone()
    }

    pub async fn shutdown(mut self) {
        self.shutting_down.store(true, Ordering::Relaxed);
        self.notify.notify_one();
        if let Some(worker) = self.worker.take() {
            if let Err(err) = worker.await {
                error!("cron worker crashed: {:?}", err);
            }
        }
    }
}

async fn tick_loop<H>(
    hook: Arc<H>,
    interval: Duration,
    runs: Arc<RwLock<Vec<CronRun>>>,
    notify: Arc<Notify>,
    shutting_down: Arc<AtomicBool>,
) where
    H: ScheduleHook,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = notify.notified() => {}
        }
        if shutting_down.load(Ordering::Relaxed) {
            break;
        }

        let now = Utc::now();
        let run = match hook.run(now).await {
            Ok(changed) => {
                info!(changed, "cron tick completed");
                CronRun { at: now, changed, error: None }
            }
            Err(err) => {
                error!(error = %err, "cron tick failed");
                CronRun { at: now, changed: 0, error: Some(err) }
            }
        };

        let mut history = runs.write();
        history.push(run);
        if history.len() > HISTORY_LIMIT {
            let overflow = history.len() - HISTORY_LIMIT;
            history.drain(..overflow);
        }
    }
}
