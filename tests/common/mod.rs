//! Common test utilities
//!
//! Recording collaborators for the restart coordinator. Each one counts the
//! calls it receives and can be switched into a failing mode.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};

use taskhub::coordinator::{RestartCoordinator, RestartService, RestartServiceError};
use taskhub::crawler::{CrawlEngine, CrawlError};
use taskhub::models::{Task, TaskStatus};
use taskhub::scheduler::{CronScheduler, JobHandle, SchedulerError, SchedulerResult};
use taskhub::storage::{StoreError, StoreResult, TaskStore};

/// Create a stopped recurring task
pub fn stopped_recurring(id: u64) -> Task {
    Task::new(id, format!("task-{id}"), "0 */5 * * *", TaskStatus::Stopped)
}

// ============================================================================
// Store
// ============================================================================

#[derive(Default)]
pub struct MockStore {
    tasks: Mutex<HashMap<u64, Task>>,
    pub loads: AtomicUsize,
    pub updates: Mutex<Vec<(u64, TaskStatus)>>,
    pub fail_load: AtomicBool,
    pub fail_update: AtomicBool,
    pub stall_update: AtomicBool,
}

impl MockStore {
    pub fn with_task(task: Task) -> Self {
        let store = Self::default();
        store.insert(task);
        store
    }

    pub fn insert(&self, task: Task) {
        self.tasks.lock().unwrap().insert(task.id, task);
    }

    pub fn status_of(&self, id: u64) -> Option<TaskStatus> {
        self.tasks.lock().unwrap().get(&id).map(|t| t.status)
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

#[async_trait]
impl TaskStore for MockStore {
    async fn load_by_id(&self, id: u64) -> StoreResult<Task> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("connection reset".to_string()));
        }
        self.tasks
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(id))
    }

    async fn update_status(&self, id: u64, status: TaskStatus) -> StoreResult<()> {
        if self.stall_update.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("write rejected".to_string()));
        }
        self.updates.lock().unwrap().push((id, status));
        match self.tasks.lock().unwrap().get_mut(&id) {
            Some(task) => {
                task.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound(id)),
        }
    }
}

// ============================================================================
// Restart Service
// ============================================================================

/// Restart service that can be held open until the test releases it
pub struct MockRestarter {
    pub calls: Mutex<Vec<u64>>,
    pub fail: AtomicBool,
    hold: AtomicBool,
    pub entered: Notify,
    release: Semaphore,
}

impl Default for MockRestarter {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            hold: AtomicBool::new(false),
            entered: Notify::new(),
            release: Semaphore::new(0),
        }
    }
}

impl MockRestarter {
    /// Block every call until `release` is called
    pub fn holding() -> Self {
        let restarter = Self::default();
        restarter.hold.store(true, Ordering::SeqCst);
        restarter
    }

    /// Let `n` held calls proceed
    pub fn release(&self, n: usize) {
        self.release.add_permits(n);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RestartService for MockRestarter {
    async fn restart(&self, task: &Task) -> Result<(), RestartServiceError> {
        self.calls.lock().unwrap().push(task.id);

        if self.hold.load(Ordering::SeqCst) {
            self.entered.notify_one();
            if let Ok(permit) = self.release.acquire().await {
                permit.forget();
            }
        }

        if self.fail.load(Ordering::SeqCst) {
            return Err(SchedulerError::invalid_cron_spec(task.id, task.cron_spec.clone()).into());
        }
        Ok(())
    }
}

// ============================================================================
// Cron Scheduler
// ============================================================================

#[derive(Default)]
pub struct MockJob {
    task_id: u64,
    pub stops: AtomicUsize,
}

impl JobHandle for MockJob {
    fn task_id(&self) -> u64 {
        self.task_id
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn is_stopped(&self) -> bool {
        self.stops.load(Ordering::SeqCst) > 0
    }
}

#[derive(Default)]
pub struct MockCron {
    jobs: Mutex<HashMap<u64, Arc<MockJob>>>,
    pub lookups: AtomicUsize,
}

impl MockCron {
    /// Register a live job for the task
    pub fn add_job(&self, task_id: u64) -> Arc<MockJob> {
        let job = Arc::new(MockJob {
            task_id,
            stops: AtomicUsize::new(0),
        });
        self.jobs.lock().unwrap().insert(task_id, job.clone());
        job
    }

    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CronScheduler for MockCron {
    async fn schedule(&self, task: &Task) -> SchedulerResult<()> {
        self.add_job(task.id);
        Ok(())
    }

    async fn lookup_job(&self, task_id: u64) -> Option<Arc<dyn JobHandle>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.jobs
            .lock()
            .unwrap()
            .get(&task_id)
            .map(|j| j.clone() as Arc<dyn JobHandle>)
    }
}

// ============================================================================
// Crawl Engine
// ============================================================================

#[derive(Default)]
pub struct MockEngine {
    pub cancels: Mutex<Vec<u64>>,
    pub fail_cancel: AtomicBool,
}

impl MockEngine {
    pub fn cancel_count(&self) -> usize {
        self.cancels.lock().unwrap().len()
    }
}

#[async_trait]
impl CrawlEngine for MockEngine {
    async fn start_job(&self, _task: &Task) -> Result<(), CrawlError> {
        Ok(())
    }

    async fn cancel_job(&self, task_id: u64) -> Result<(), CrawlError> {
        self.cancels.lock().unwrap().push(task_id);
        if self.fail_cancel.load(Ordering::SeqCst) {
            return Err(CrawlError::JobNotFound(task_id));
        }
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

/// Coordinator wired to recording collaborators
pub struct Harness {
    pub store: Arc<MockStore>,
    pub restarter: Arc<MockRestarter>,
    pub cron: Arc<MockCron>,
    pub engine: Arc<MockEngine>,
    pub coordinator: Arc<RestartCoordinator>,
}

impl Harness {
    pub fn new(store: MockStore, restarter: MockRestarter) -> Self {
        let store = Arc::new(store);
        let restarter = Arc::new(restarter);
        let cron = Arc::new(MockCron::default());
        let engine = Arc::new(MockEngine::default());
        let coordinator = Arc::new(RestartCoordinator::new(
            store.clone(),
            restarter.clone(),
            cron.clone(),
            engine.clone(),
        ));

        Self {
            store,
            restarter,
            cron,
            engine,
            coordinator,
        }
    }

    pub fn with_task(task: Task) -> Self {
        Self::new(MockStore::with_task(task), MockRestarter::default())
    }
}
