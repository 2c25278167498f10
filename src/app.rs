//! Application wiring
//!
//! Builds the in-process collaborators and the restart coordinator from a
//! [`Config`].

use std::sync::Arc;

use crate::config::Config;
use crate::coordinator::{JobRestarter, RestartCoordinator, ServerError, TaskServer};
use crate::crawler::CrawlJobRegistry;
use crate::error::{Error, Result};
use crate::scheduler::CronRegistry;
use crate::storage::{InMemoryTaskStore, SharedTaskStore, SqliteTaskStore};

/// Fully wired taskhub components
pub struct App {
    pub store: SharedTaskStore,
    pub engine: Arc<CrawlJobRegistry>,
    pub cron: Arc<CronRegistry>,
    pub coordinator: Arc<RestartCoordinator>,
}

impl App {
    /// Open the SQLite store at the configured path and wire everything to it
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(SqliteTaskStore::new(&config.database.sqlite_path)?);
        Self::with_store(store, config)
    }

    /// Wire everything to an in-memory store
    pub fn in_memory(config: &Config) -> Result<Self> {
        config.validate()?;
        Self::with_store(Arc::new(InMemoryTaskStore::new()), config)
    }

    /// Wire everything to the given store
    pub fn with_store(store: SharedTaskStore, config: &Config) -> Result<Self> {
        let engine = Arc::new(CrawlJobRegistry::default());
        let cron = Arc::new(CronRegistry::new(engine.clone(), config.tick_interval())?);
        let restarter = Arc::new(JobRestarter::new(cron.clone(), engine.clone()));

        let mut coordinator =
            RestartCoordinator::new(store.clone(), restarter, cron.clone(), engine.clone());
        if let Some(deadline) = config.server.restart_timeout() {
            coordinator = coordinator.with_deadline(deadline);
        }

        tracing::debug!(
            tick_interval_secs = config.scheduler.tick_interval_secs,
            restart_timeout_secs = ?config.server.restart_timeout_secs,
            "Application components wired"
        );

        Ok(Self {
            store,
            engine,
            cron,
            coordinator: Arc::new(coordinator),
        })
    }

    /// Build the HTTP server over these components
    pub fn server(&self, config: &Config) -> Result<TaskServer> {
        TaskServer::new(
            config.server.clone(),
            self.coordinator.clone(),
            self.store.clone(),
        )
        .map_err(|e: ServerError| Error::with_source("Failed to create task server", e))
    }

    /// Stop all cron jobs and cancel running crawls
    pub async fn shutdown(&self) {
        self.cron.stop_all().await;
        self.engine.cancel_all().await;
        tracing::info!("Scheduler and crawl jobs stopped");
    }
}
