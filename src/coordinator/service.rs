//! Job (re)creation for a task
//!
//! A restart brings back both halves of a recurring crawl task: the cron
//! job that fires future runs, and an immediate crawl job.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::crawler::{CrawlEngine, CrawlError};
use crate::models::Task;
use crate::scheduler::{CronScheduler, SchedulerError};

/// Failure to bring the task's jobs back up
#[derive(Error, Debug)]
pub enum RestartServiceError {
    #[error("failed to schedule cron job: {0}")]
    Schedule(#[from] SchedulerError),

    #[error("failed to start crawl job: {0}")]
    Crawl(#[from] CrawlError),
}

/// Re-creates the cron job and crawl job of a task
#[async_trait]
pub trait RestartService: Send + Sync {
    async fn restart(&self, task: &Task) -> Result<(), RestartServiceError>;
}

/// Default [`RestartService`] backed by a cron scheduler and a crawl engine
pub struct JobRestarter {
    cron: Arc<dyn CronScheduler>,
    engine: Arc<dyn CrawlEngine>,
}

impl JobRestarter {
    pub fn new(cron: Arc<dyn CronScheduler>, engine: Arc<dyn CrawlEngine>) -> Self {
        Self { cron, engine }
    }
}

#[async_trait]
impl RestartService for JobRestarter {
    async fn restart(&self, task: &Task) -> Result<(), RestartServiceError> {
        self.cron.schedule(task).await?;

        if let Err(e) = self.engine.start_job(task).await {
            // Nothing may keep running when the restart reports failure
            if let Some(job) = self.cron.lookup_job(task.id).await {
                job.stop();
            }
            return Err(e.into());
        }

        tracing::debug!(task_id = %task.id, "Cron and crawl jobs started");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::{CrawlJobRegistry, CrawlReport, CrawlRunner};
    use crate::models::TaskStatus;
    use crate::scheduler::CronRegistry;
    use std::time::Duration;
    use tokio::sync::watch;

    struct PendingRunner;

    #[async_trait]
    impl CrawlRunner for PendingRunner {
        async fn run(
            &self,
            _task: Task,
            mut cancel: watch::Receiver<bool>,
        ) -> Result<CrawlReport, CrawlError> {
            let _ = cancel.wait_for(|c| *c).await;
            Ok(CrawlReport::default())
        }
    }

    fn setup() -> (Arc<CronRegistry>, Arc<CrawlJobRegistry>, JobRestarter) {
        let engine = Arc::new(CrawlJobRegistry::new(Arc::new(PendingRunner)));
        let cron = Arc::new(CronRegistry::new(engine.clone(), Duration::from_secs(3600)).unwrap());
        let restarter = JobRestarter::new(cron.clone(), engine.clone());
        (cron, engine, restarter)
    }

    #[tokio::test]
    async fn test_restart_starts_both_jobs() {
        let (cron, engine, restarter) = setup();
        let task = Task::new(7, "news", "0 * * * *", TaskStatus::Stopped);

        restarter.restart(&task).await.unwrap();

        assert!(cron.lookup_job(7).await.is_some());
        assert!(engine.is_running(7).await);

        cron.stop_all().await;
        engine.cancel_all().await;
    }

    #[tokio::test]
    async fn test_crawl_failure_stops_cron_job() {
        let (cron, engine, restarter) = setup();
        let task = Task::new(7, "news", "0 * * * *", TaskStatus::Stopped);

        // Occupy the crawl slot so the restart cannot start a new run
        engine.start_job(&task).await.unwrap();

        let err = restarter.restart(&task).await.unwrap_err();
        assert!(matches!(err, RestartServiceError::Crawl(CrawlError::AlreadyRunning(7))));
        assert!(cron.lookup_job(7).await.is_none());

        engine.cancel_all().await;
    }

    #[tokio::test]
    async fn test_schedule_failure_skips_crawl() {
        let (_cron, engine, restarter) = setup();
        let task = Task::new(8, "once", "", TaskStatus::Stopped);

        let err = restarter.restart(&task).await.unwrap_err();
        assert!(matches!(err, RestartServiceError::Schedule(_)));
        assert!(!engine.is_running(8).await);
    }
}
