//! Recurring crawl scheduling
//!
//! This module owns the recurring (cron) side of a crawl task. A scheduled
//! task gets a [`CronJob`] that periodically asks the crawl engine for a new
//! run; the job can be looked up by task id and stopped at any time.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │         CronRegistry         │
//! │  task id ─► CronJob          │
//! │             ├ shutdown (watch)│
//! │             └ tick loop ─────┼──► CrawlEngine::start_job
//! └──────────────────────────────┘
//! ```
//!
//! Parsing cron expressions is not done here: the expression is stored with
//! the job and the tick period comes from configuration.
//!
//! # Quick Start
//!
//! ```ignore
//! use taskhub::scheduler::{CronRegistry, CronScheduler};
//!
//! let cron = CronRegistry::new(engine, Duration::from_secs(60))?;
//! cron.schedule(&task).await?;
//!
//! if let Some(job) = cron.lookup_job(task.id).await {
//!     job.stop();
//! }
//! ```

pub mod cron;
pub mod error;

// Re-export main types
pub use cron::{CronJob, CronRegistry, CronScheduler, JobHandle};
pub use error::{SchedulerError, SchedulerResult};
