//! taskhub - Task management for recurring crawl jobs
//!
//! Keeps recurring crawl tasks, their cron jobs and their crawl runs in step,
//! and restarts stopped tasks safely under concurrent requests.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`models`] - Core data structures and types
//! - [`storage`] - Task persistence (SQLite, in-memory)
//! - [`scheduler`] - Recurring (cron) job registry
//! - [`crawler`] - Crawl job engine
//! - [`coordinator`] - Restart coordination and HTTP API
//! - [`metrics`] - Prometheus metrics
//! - [`app`] - Wiring of all components
//!
//! # Example
//!
//! ```no_run
//! use taskhub::app::App;
//! use taskhub::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let app = App::open(&config)?;
//!     let outcome = app.coordinator.restart_raw("7").await;
//!     println!("{} {}", outcome.status_code(), outcome.message());
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod config;
pub mod coordinator;
pub mod crawler;
pub mod error;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::app::App;
    pub use crate::config::Config;
    pub use crate::coordinator::{RestartCoordinator, RestartError, RestartOutcome, TaskLock};
    pub use crate::error::{Error, ErrorCategory, Result, TaskhubErrorTrait};
    pub use crate::models::{Task, TaskStatus};
    pub use crate::storage::{SqliteTaskStore, TaskStore};
}

// Direct re-exports for convenience
pub use models::{Task, TaskStatus};
