//! Crawl job execution
//!
//! [`CrawlJobRegistry`] is the in-process [`CrawlEngine`]: it tracks one
//! running crawl job per task and lets callers cancel it by task id. The
//! crawl itself is delegated to a [`CrawlRunner`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{watch, RwLock};
use uuid::Uuid;

use crate::models::Task;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by crawl engines
#[derive(Error, Debug)]
pub enum CrawlError {
    /// No running job for the task
    #[error("no running crawl job for task {0}")]
    JobNotFound(u64),

    /// A job for the task is already running
    #[error("crawl job for task {0} is already running")]
    AlreadyRunning(u64),

    /// The runner reported a failure
    #[error("crawl runner failed: {0}")]
    Runner(String),
}

impl CrawlError {
    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::AlreadyRunning(_) | Self::Runner(_))
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Starts and cancels crawl jobs
#[async_trait]
pub trait CrawlEngine: Send + Sync {
    /// Start an executable crawl job for the task
    async fn start_job(&self, task: &Task) -> Result<(), CrawlError>;

    /// Cancel the running crawl job for the task
    async fn cancel_job(&self, task_id: u64) -> Result<(), CrawlError>;
}

/// Result of one crawl run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CrawlReport {
    pub items_crawled: u64,
    pub cancelled: bool,
}

/// Performs the actual crawl for a task
///
/// Implementations should watch `cancel` and return early once it flips
/// to `true`; the registry also drops the run future on cancellation.
#[async_trait]
pub trait CrawlRunner: Send + Sync {
    async fn run(&self, task: Task, cancel: watch::Receiver<bool>) -> Result<CrawlReport, CrawlError>;
}

/// Runner that only logs the crawl
#[derive(Debug, Default, Clone)]
pub struct LoggingRunner;

#[async_trait]
impl CrawlRunner for LoggingRunner {
    async fn run(&self, task: Task, _cancel: watch::Receiver<bool>) -> Result<CrawlReport, CrawlError> {
        tracing::info!(task_id = %task.id, name = %task.name, "Crawl run executed");
        Ok(CrawlReport::default())
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Snapshot of a running crawl job
#[derive(Debug, Clone, Serialize)]
pub struct CrawlJobInfo {
    pub task_id: u64,
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
}

struct RunningJob {
    info: CrawlJobInfo,
    cancel: watch::Sender<bool>,
}

/// In-process crawl engine
pub struct CrawlJobRegistry {
    runner: Arc<dyn CrawlRunner>,
    jobs: Arc<RwLock<HashMap<u64, RunningJob>>>,
}

impl CrawlJobRegistry {
    /// Create a registry that executes crawls with `runner`
    pub fn new(runner: Arc<dyn CrawlRunner>) -> Self {
        Self {
            runner,
            jobs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Check whether a crawl is running for the task
    pub async fn is_running(&self, task_id: u64) -> bool {
        self.jobs.read().await.contains_key(&task_id)
    }

    /// List running crawl jobs
    pub async fn running_jobs(&self) -> Vec<CrawlJobInfo> {
        let jobs = self.jobs.read().await;
        let mut infos: Vec<_> = jobs.values().map(|j| j.info.clone()).collect();
        infos.sort_by_key(|i| i.task_id);
        infos
    }

    /// Cancel every running job
    pub async fn cancel_all(&self) {
        let mut jobs = self.jobs.write().await;
        for (task_id, job) in jobs.drain() {
            job.cancel.send_replace(true);
            tracing::debug!(task_id = %task_id, "Crawl job cancelled on shutdown");
        }
    }
}

impl Default for CrawlJobRegistry {
    fn default() -> Self {
        Self::new(Arc::new(LoggingRunner))
    }
}

#[async_trait]
impl CrawlEngine for CrawlJobRegistry {
    async fn start_job(&self, task: &Task) -> Result<(), CrawlError> {
        let (cancel_tx, mut cancel_rx) = watch::channel(false);
        let run_id = Uuid::new_v4();

        {
            let mut jobs = self.jobs.write().await;
            if jobs.contains_key(&task.id) {
                return Err(CrawlError::AlreadyRunning(task.id));
            }
            jobs.insert(
                task.id,
                RunningJob {
                    info: CrawlJobInfo {
                        task_id: task.id,
                        run_id,
                        started_at: Utc::now(),
                    },
                    cancel: cancel_tx,
                },
            );
        }

        let runner = self.runner.clone();
        let jobs = self.jobs.clone();
        let task = task.clone();
        let task_id = task.id;
        let runner_cancel = cancel_rx.clone();

        tokio::spawn(async move {
            let result = tokio::select! {
                result = runner.run(task, runner_cancel) => result,
                _ = cancel_rx.wait_for(|cancelled| *cancelled) => Ok(CrawlReport {
                    items_crawled: 0,
                    cancelled: true,
                }),
            };

            match result {
                Ok(report) if report.cancelled => {
                    tracing::info!(task_id = %task_id, run_id = %run_id, "Crawl job cancelled");
                }
                Ok(report) => {
                    tracing::info!(
                        task_id = %task_id,
                        run_id = %run_id,
                        items = report.items_crawled,
                        "Crawl job finished"
                    );
                }
                Err(e) => {
                    tracing::warn!(task_id = %task_id, run_id = %run_id, error = %e, "Crawl job failed");
                }
            }

            // A cancelled job may already have been replaced by a newer run
            let mut jobs = jobs.write().await;
            if jobs.get(&task_id).map(|j| j.info.run_id) == Some(run_id) {
                jobs.remove(&task_id);
            }
        });

        tracing::debug!(task_id = %task_id, run_id = %run_id, "Crawl job started");
        Ok(())
    }

    async fn cancel_job(&self, task_id: u64) -> Result<(), CrawlError> {
        let job = self
            .jobs
            .write()
            .await
            .remove(&task_id)
            .ok_or(CrawlError::JobNotFound(task_id))?;

        job.cancel.send_replace(true);
        tracing::info!(task_id = %task_id, run_id = %job.info.run_id, "Crawl job cancel requested");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
