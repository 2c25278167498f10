//! Restart coordination for recurring crawl tasks
//!
//! This module owns the restart flow for stopped recurring tasks and the
//! HTTP server that exposes it.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Task Server               │
//! │                                         │
//! │  ┌───────────────────────────────────┐  │
//! │  │            REST API               │  │
//! │  │  POST /api/tasks/{id}/restart     │  │
//! │  │  GET  /api/tasks/{id}             │  │
//! │  │  GET  /api/health                 │  │
//! │  │  GET  /metrics                    │  │
//! │  └───────────────────────────────────┘  │
//! │                   │                     │
//! │  ┌───────────────────────────────────┐  │
//! │  │       Restart Coordinator         │  │
//! │  │  - Per-task lock                  │  │
//! │  │  - Eligibility check              │  │
//! │  │  - Job restart + status commit    │  │
//! │  │  - Compensation on failed commit  │  │
//! │  └───────────────────────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use taskhub::coordinator::{RestartCoordinator, ServerConfig, TaskServer};
//!
//! let coordinator = Arc::new(RestartCoordinator::new(store.clone(), restarter, cron, engine));
//! let server = TaskServer::new(ServerConfig::default(), coordinator, store)?;
//! server.start().await?;
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod lock;
pub mod restart;
pub mod server;
pub mod service;

// Re-export main types
pub use config::ServerConfig;
pub use error::{Ineligibility, RestartError, RestartOutcome};
pub use lock::{TaskLock, TaskLockGuard};
pub use restart::{check_eligibility, parse_task_id, CompensationReport, RestartCoordinator};
pub use server::{AppState, ServerError, TaskServer};
pub use service::{JobRestarter, RestartService, RestartServiceError};
