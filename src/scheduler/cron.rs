//! Recurring job registry
//!
//! [`CronRegistry`] is the in-process [`CronScheduler`]. Each scheduled task
//! gets one [`CronJob`] whose background loop asks the crawl engine for a
//! new run on every tick until the job is stopped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};

use crate::crawler::{CrawlEngine, CrawlError};
use crate::models::Task;

use super::error::{SchedulerError, SchedulerResult};

// ============================================================================
// Traits
// ============================================================================

/// Handle to a running recurring job
pub trait JobHandle: Send + Sync {
    /// Task the job belongs to
    fn task_id(&self) -> u64;

    /// Stop the job; idempotent
    fn stop(&self);

    /// Whether `stop` has been called
    fn is_stopped(&self) -> bool;
}

/// Creates and looks up recurring jobs
#[async_trait]
pub trait CronScheduler: Send + Sync {
    /// Create and start a recurring job for the task, replacing any existing one
    async fn schedule(&self, task: &Task) -> SchedulerResult<()>;

    /// Find the active job for a task
    async fn lookup_job(&self, task_id: u64) -> Option<Arc<dyn JobHandle>>;
}

// ============================================================================
// Cron Job
// ============================================================================

/// A recurring job driven by a tokio interval
#[derive(Debug)]
pub struct CronJob {
    task_id: u64,
    cron_spec: String,
    created_at: DateTime<Utc>,
    shutdown: watch::Sender<bool>,
}

impl CronJob {
    /// Cron expression the job was created with
    pub fn cron_spec(&self) -> &str {
        &self.cron_spec
    }

    /// Creation time
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl JobHandle for CronJob {
    fn task_id(&self) -> u64 {
        self.task_id
    }

    fn stop(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!(task_id = %self.task_id, "Cron job stopped");
        }
    }

    fn is_stopped(&self) -> bool {
        *self.shutdown.borrow()
    }
}

// ============================================================================
// Registry
// ============================================================================

/// In-process cron scheduler
pub struct CronRegistry {
    engine: Arc<dyn CrawlEngine>,
    tick_interval: Duration,
    jobs: RwLock<HashMap<u64, Arc<CronJob>>>,
    closed: AtomicBool,
}

impl CronRegistry {
    /// Create a registry firing crawls every `tick_interval`
    pub fn new(engine: Arc<dyn CrawlEngine>, tick_interval: Duration) -> SchedulerResult<Self> {
        if tick_interval.is_zero() {
            return Err(SchedulerError::InvalidInterval {
                secs: tick_interval.as_secs(),
            });
        }

        Ok(Self {
            engine,
            tick_interval,
            jobs: RwLock::new(HashMap::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Number of active jobs
    pub async fn active_jobs(&self) -> usize {
        self.jobs
            .read()
            .await
            .values()
            .filter(|j| !j.is_stopped())
            .count()
    }

    /// Stop and forget every job; later `schedule` calls are refused
    pub async fn stop_all(&self) {
        self.closed.store(true, Ordering::SeqCst);
        let mut jobs = self.jobs.write().await;
        for (_, job) in jobs.drain() {
            job.stop();
        }
    }

    fn spawn_loop(&self, task: Task, mut shutdown: watch::Receiver<bool>) {
        let engine = self.engine.clone();
        let period = self.tick_interval;

        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match engine.start_job(&task).await {
                            Ok(()) => tracing::debug!(task_id = %task.id, "Cron tick started crawl"),
                            Err(CrawlError::AlreadyRunning(_)) => {
                                tracing::debug!(task_id = %task.id, "Previous crawl still running, tick skipped");
                            }
                            Err(e) => {
                                tracing::warn!(task_id = %task.id, error = %e, "Cron tick failed to start crawl");
                            }
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            tracing::debug!(task_id = %task.id, "Cron loop exited");
        });
    }
}

#[async_trait]
impl CronScheduler for CronRegistry {
    async fn schedule(&self, task: &Task) -> SchedulerResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SchedulerError::ShuttingDown);
        }
        if !task.is_recurring() {
            return Err(SchedulerError::invalid_cron_spec(task.id, task.cron_spec.clone()));
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let job = Arc::new(CronJob {
            task_id: task.id,
            cron_spec: task.cron_spec.clone(),
            created_at: Utc::now(),
            shutdown: shutdown_tx,
        });

        let previous = self.jobs.write().await.insert(task.id, job);
        if let Some(previous) = previous {
            previous.stop();
        }

        self.spawn_loop(task.clone(), shutdown_rx);

        tracing::info!(task_id = %task.id, cron_spec = %task.cron_spec, "Cron job scheduled");
        Ok(())
    }

    async fn lookup_job(&self, task_id: u64) -> Option<Arc<dyn JobHandle>> {
        let jobs = self.jobs.read().await;
        jobs.get(&task_id)
            .filter(|j| !j.is_stopped())
            .map(|j| j.clone() as Arc<dyn JobHandle>)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;
    use std::sync::Mutex;

    #[derive(Default)]
    struct CountingEngine {
        started: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl CrawlEngine for CountingEngine {
        async fn start_job(&self, task: &Task) -> Result<(), CrawlError> {
            self.started.lock().unwrap().push(task.id);
            Ok(())
        }

        async fn cancel_job(&self, _task_id: u64) -> Result<(), CrawlError> {
            Ok(())
        }
    }

    fn recurring(id: u64) -> Task {
        Task::new(id, "news", "0 * * * *", TaskStatus::Stopped)
    }

    #[test]
    fn test_zero_interval_rejected() {
        let engine = Arc::new(CountingEngine::default());
        let result = CronRegistry::new(engine, Duration::ZERO);
        assert!(matches!(result, Err(SchedulerError::InvalidInterval { .. })));
    }

    #[tokio::test]
    async fn test_schedule_and_lookup() {
        let engine = Arc::new(CountingEngine::default());
        let registry = CronRegistry::new(engine, Duration::from_secs(3600)).unwrap();

        registry.schedule(&recurring(7)).await.unwrap();

        let job = registry.lookup_job(7).await.expect("job should exist");
        assert_eq!(job.task_id(), 7);
        assert!(!job.is_stopped());

        job.stop();
        job.stop();
        assert!(registry.lookup_job(7).await.is_none());
    }

    #[tokio::test]
    async fn test_schedule_rejects_one_shot_task() {
        let engine = Arc::new(CountingEngine::default());
        let registry = CronRegistry::new(engine, Duration::from_secs(60)).unwrap();

        let task = Task::new(1, "once", "", TaskStatus::Stopped);
        let err = registry.schedule(&task).await.unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidCronSpec { task_id: 1, .. }));
        assert_eq!(registry.active_jobs().await, 0);
    }

    #[tokio::test]
    async fn test_reschedule_replaces_job() {
        let engine = Arc::new(CountingEngine::default());
        let registry = CronRegistry::new(engine, Duration::from_secs(3600)).unwrap();

        registry.schedule(&recurring(7)).await.unwrap();
        let first = registry.lookup_job(7).await.unwrap();

        registry.schedule(&recurring(7)).await.unwrap();
        assert!(first.is_stopped());
        assert_eq!(registry.active_jobs().await, 1);

        registry.stop_all().await;
        assert_eq!(registry.active_jobs().await, 0);

        let err = registry.schedule(&recurring(8)).await.unwrap_err();
        assert!(matches!(err, SchedulerError::ShuttingDown));
    }

    #[tokio::test(start_paused = true)]
    async fn test_tick_starts_crawl() {
        let engine = Arc::new(CountingEngine::default());
        let registry = CronRegistry::new(engine.clone(), Duration::from_secs(60)).unwrap();

        registry.schedule(&recurring(3)).await.unwrap();
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert_eq!(engine.started.lock().unwrap().as_slice(), &[3]);

        registry.stop_all().await;
    }
}
