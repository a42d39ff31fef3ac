//! 后台定时任务。仅 leader 实例调度；每个任务带防重入标记与超时。

pub mod cache_cleanup;

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::config::WorkerConfig;
use crate::state::AppState;

const WORKER_TIMEOUT: Duration = Duration::from_secs(120);

#[cfg(test)]
const DRAIN_TIMEOUT: Duration = Duration::from_millis(10);
#[cfg(not(test))]
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

type Tick = Pin<Box<dyn Future<Output = ()> + Send>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerName {
    CacheCleanup,
}

impl WorkerName {
    pub const ALL: [WorkerName; 1] = [WorkerName::CacheCleanup];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::CacheCleanup => "cache_cleanup",
        }
    }

    /// Six-field cron expression (with seconds).
    pub fn cron(self) -> &'static str {
        match self {
            Self::CacheCleanup => "0 */10 * * * *",
        }
    }

    fn tick(self, state: &AppState) -> Tick {
        let state = state.clone();
        match self {
            Self::CacheCleanup => Box::pin(async move {
                cache_cleanup::run(state.query_cache(), state.memoizer()).await;
            }),
        }
    }
}

pub struct WorkerManager {
    state: AppState,
    shutdown_rx: broadcast::Receiver<()>,
    is_leader: bool,
}

impl WorkerManager {
    pub fn new(
        state: AppState,
        shutdown_rx: broadcast::Receiver<()>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            state,
            shutdown_rx,
            is_leader: config.is_leader,
        }
    }

    /// Workers this instance schedules; followers run none.
    pub fn scheduled(&self) -> Vec<WorkerName> {
        if self.is_leader {
            WorkerName::ALL.to_vec()
        } else {
            Vec::new()
        }
    }

    /// Runs until the shutdown signal, then drains and stops the scheduler.
    pub async fn start(mut self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let workers = self.scheduled();
        if workers.is_empty() {
            tracing::info!("Not the worker leader, no jobs scheduled");
            return Ok(());
        }

        let mut scheduler = JobScheduler::new().await?;
        for name in workers {
            match guarded_job(name, self.state.clone()) {
                Ok(job) => {
                    scheduler.add(job).await?;
                    tracing::info!(worker = name.as_str(), cron = name.cron(), "Worker scheduled");
                }
                Err(err) => {
                    tracing::error!(worker = name.as_str(), error = %err, "Invalid worker job")
                }
            }
        }
        scheduler.start().await?;

        let _ = self.shutdown_rx.recv().await;
        tracing::info!(drain_secs = DRAIN_TIMEOUT.as_secs(), "Stopping workers");
        tokio::time::sleep(DRAIN_TIMEOUT).await;
        scheduler.shutdown().await?;
        Ok(())
    }
}

/// 上一次执行未结束时跳过本次触发
fn guarded_job(
    name: WorkerName,
    state: AppState,
) -> Result<Job, tokio_cron_scheduler::JobSchedulerError> {
    let running = Arc::new(AtomicBool::new(false));

    Job::new_async(name.cron(), move |_id, _scheduler| {
        let running = running.clone();
        if running.swap(true, Ordering::AcqRel) {
            tracing::warn!(worker = name.as_str(), "Previous run still active, skipping");
            return Box::pin(async {});
        }

        let tick = name.tick(&state);
        Box::pin(async move {
            if tokio::time::timeout(WORKER_TIMEOUT, tick).await.is_err() {
                tracing::error!(
                    worker = name.as_str(),
                    timeout_secs = WORKER_TIMEOUT.as_secs(),
                    "Worker timed out"
                );
            }
            running.store(false, Ordering::Release);
        })
    })
}
