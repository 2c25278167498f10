//! Restart coordination for recurring crawl tasks
//!
//! A restart runs these steps in order, all while holding the task's lock:
//!
//! ```text
//! lock ─► load ─► validate ─► start jobs ─► commit Completed
//!   │       │         │            │              │
//!   409    500       400          500     ok ─► 200
//!                                         err ─► compensate ─► 500
//! ```
//!
//! The lock is held by a [`TaskLockGuard`](super::lock::TaskLockGuard) and
//! released on every exit path. Compensation runs when the jobs may have
//! been started but the status was not committed: a failed commit, or a
//! deadline that expires while the jobs are being started.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::crawler::CrawlEngine;
use crate::metrics;
use crate::models::{Task, TaskStatus};
use crate::scheduler::CronScheduler;
use crate::storage::TaskStore;

use super::error::{Ineligibility, RestartError, RestartOutcome};
use super::lock::TaskLock;
use super::service::RestartService;

/// What the rollback after a failed commit managed to do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompensationReport {
    /// A live cron job was found and stopped
    pub cron_job_stopped: bool,
    /// Error returned by the crawl engine when cancelling, if any
    pub crawl_cancel_error: Option<String>,
}

// How far a guarded restart got; read when the deadline expires
const PHASE_PREPARE: u8 = 0;
const PHASE_INVOKE: u8 = 1;
const PHASE_COMMIT: u8 = 2;

/// Parse a task id the way it arrives in a request path
///
/// Only plain base-10 digits are accepted; signs and whitespace are not.
pub fn parse_task_id(raw: &str) -> Result<u64, RestartError> {
    let malformed = || RestartError::MalformedInput { raw: raw.to_string() };

    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(malformed());
    }
    raw.parse::<u64>().map_err(|_| malformed())
}

/// Check that a loaded task may be restarted
pub fn check_eligibility(task: &Task) -> Result<(), RestartError> {
    if !task.is_recurring() {
        return Err(RestartError::NotEligible {
            task_id: task.id,
            reason: Ineligibility::NotRecurring,
        });
    }
    if !task.can_restart() {
        return Err(RestartError::NotEligible {
            task_id: task.id,
            reason: Ineligibility::StatusForbidsRestart(task.status),
        });
    }
    Ok(())
}

/// Orchestrates restarts of stopped recurring tasks
pub struct RestartCoordinator {
    lock: Arc<TaskLock>,
    store: Arc<dyn TaskStore>,
    restarter: Arc<dyn RestartService>,
    cron: Arc<dyn CronScheduler>,
    engine: Arc<dyn CrawlEngine>,
    deadline: Option<Duration>,
}

impl RestartCoordinator {
    /// Create a coordinator with its own lock registry and no deadline
    pub fn new(
        store: Arc<dyn TaskStore>,
        restarter: Arc<dyn RestartService>,
        cron: Arc<dyn CronScheduler>,
        engine: Arc<dyn CrawlEngine>,
    ) -> Self {
        Self {
            lock: Arc::new(TaskLock::new()),
            store,
            restarter,
            cron,
            engine,
            deadline: None,
        }
    }

    /// Share a lock registry with other components
    pub fn with_lock(mut self, lock: Arc<TaskLock>) -> Self {
        self.lock = lock;
        self
    }

    /// Bound the whole restart (load through commit) by `deadline`
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The lock registry used by this coordinator
    pub fn lock(&self) -> &Arc<TaskLock> {
        &self.lock
    }

    /// Restart a task given its raw, unparsed id
    ///
    /// A malformed id is rejected before any lock or store interaction.
    pub async fn restart_raw(&self, raw_id: &str) -> RestartOutcome {
        match parse_task_id(raw_id) {
            Ok(task_id) => self.restart(task_id).await,
            Err(e) => {
                tracing::warn!(raw_id = %raw_id, "Restart rejected: task id format is invalid");
                let outcome = RestartOutcome::from(&e);
                metrics::record_restart(outcome.label());
                outcome
            }
        }
    }

    /// Restart a task and map the result to an outcome
    pub async fn restart(&self, task_id: u64) -> RestartOutcome {
        let _timer = metrics::start_restart_timer();
        tracing::info!(task_id = %task_id, "Restart requested");

        let result = self.try_restart(task_id).await;
        if let Err(ref e) = result {
            log_failure(task_id, e);
        }

        let outcome = RestartOutcome::from(result);
        metrics::record_restart(outcome.label());
        outcome
    }

    /// Restart a task, returning the classified error on failure
    pub async fn try_restart(&self, task_id: u64) -> Result<(), RestartError> {
        let Some(_guard) = self.lock.try_acquire(task_id) else {
            return Err(RestartError::Conflict { task_id });
        };

        let phase = AtomicU8::new(PHASE_PREPARE);
        let Some(after) = self.deadline else {
            return self.run_locked(task_id, &phase).await;
        };

        match tokio::time::timeout(after, self.run_locked(task_id, &phase)).await {
            Ok(result) => result,
            Err(_) => {
                self.on_deadline_expired(task_id, phase.load(Ordering::SeqCst))
                    .await;
                Err(RestartError::Timeout { task_id, after })
            }
        }
    }

    async fn on_deadline_expired(&self, task_id: u64, phase: u8) {
        match phase {
            PHASE_INVOKE => {
                let report = self.compensate(task_id).await;
                tracing::warn!(
                    task_id = %task_id,
                    cron_job_stopped = report.cron_job_stopped,
                    crawl_cancel_error = ?report.crawl_cancel_error,
                    "Rolled back jobs after restart deadline expired"
                );
            }
            PHASE_COMMIT => {
                // The status write may or may not have landed
                tracing::error!(
                    task_id = %task_id,
                    "Restart deadline expired during status commit, task state may be inconsistent"
                );
            }
            _ => {}
        }
    }

    async fn run_locked(&self, task_id: u64, phase: &AtomicU8) -> Result<(), RestartError> {
        let task = self
            .store
            .load_by_id(task_id)
            .await
            .map_err(|source| RestartError::LoadFailure { task_id, source })?;

        check_eligibility(&task)?;

        phase.store(PHASE_INVOKE, Ordering::SeqCst);
        self.restarter
            .restart(&task)
            .await
            .map_err(|source| RestartError::InvocationFailure { task_id, source })?;

        phase.store(PHASE_COMMIT, Ordering::SeqCst);
        if let Err(source) = self.store.update_status(task_id, TaskStatus::Completed).await {
            let report = self.compensate(task_id).await;
            tracing::warn!(
                task_id = %task_id,
                cron_job_stopped = report.cron_job_stopped,
                crawl_cancel_error = ?report.crawl_cancel_error,
                "Rolled back jobs after failed status commit"
            );
            return Err(RestartError::CommitFailure { task_id, source });
        }

        tracing::info!(task_id = %task_id, "Task restarted");
        Ok(())
    }

    /// Tear down the jobs started for `task_id`
    ///
    /// Both steps always run; neither failure is propagated.
    pub async fn compensate(&self, task_id: u64) -> CompensationReport {
        metrics::record_compensation();
        let mut report = CompensationReport::default();

        match self.cron.lookup_job(task_id).await {
            Some(job) => {
                job.stop();
                report.cron_job_stopped = true;
            }
            None => {
                tracing::warn!(task_id = %task_id, "No cron job found to stop during rollback");
                metrics::record_compensation_failure("cron_stop");
            }
        }

        if let Err(e) = self.engine.cancel_job(task_id).await {
            tracing::warn!(task_id = %task_id, error = %e, "Failed to cancel crawl job during rollback");
            metrics::record_compensation_failure("crawl_cancel");
            report.crawl_cancel_error = Some(e.to_string());
        }

        report
    }
}

fn log_failure(task_id: u64, err: &RestartError) {
    match err {
        RestartError::Conflict { .. } => {
            tracing::info!(task_id = %task_id, "Restart rejected: task is already running");
        }
        e if e.is_client_error() => {
            tracing::warn!(task_id = %task_id, error = %e, "Restart rejected");
        }
        e => {
            tracing::error!(task_id = %task_id, error = %e, "Restart failed");
        }
    }
}
