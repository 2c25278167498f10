//! Repository Pattern for Task Persistence
//!
//! This module provides trait-based repository abstractions to decouple
//! restart coordination from storage implementations, enabling:
//! - Easy testing with in-memory implementations
//! - Swappable storage backends
//! - Clear separation of concerns
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Restart Coordinator                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TaskStore trait                         │
//! └─────────────────────────────────────────────────────────────┘
//!                   │                       │
//!                   ▼                       ▼
//!          ┌─────────────────┐     ┌─────────────────┐
//!          │     SQLite      │     │    In-memory    │
//!          │  Implementation │     │  Implementation │
//!          └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use taskhub::storage::{SqliteTaskStore, TaskStore};
//!
//! let store = SqliteTaskStore::new("data/tasks.db")?;
//! let task = store.load_by_id(7).await?;
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::models::{Task, TaskStatus};

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by task stores
#[derive(Error, Debug)]
pub enum StoreError {
    /// No task with the given id
    #[error("task not found: {0}")]
    NotFound(u64),

    /// A task with the given id already exists
    #[error("task already exists: {0}")]
    AlreadyExists(u64),

    /// Underlying SQLite failure
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// I/O failure while preparing the database location
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Lock poisoned by a panicking writer
    #[error("store lock poisoned")]
    Poisoned,

    /// Backend-specific failure
    #[error("{0}")]
    Backend(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

// ============================================================================
// Repository Trait
// ============================================================================

/// Persistence of crawl tasks
///
/// Only the two operations the restart workflow depends on are required.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load a task by id
    async fn load_by_id(&self, id: u64) -> StoreResult<Task>;

    /// Persist a new status for a task
    async fn update_status(&self, id: u64, status: TaskStatus) -> StoreResult<()>;
}

/// Thread-safe shared store
pub type SharedTaskStore = Arc<dyn TaskStore>;

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of TaskStore
///
/// Uses `Mutex` to ensure thread-safety for the SQLite connection.
pub struct SqliteTaskStore {
    conn: Mutex<Connection>,
}

impl SqliteTaskStore {
    /// Open (or create) a store at the given path
    pub fn new(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrency
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;

        tracing::info!(path = %path.display(), "SQLite task store initialized");
        Ok(store)
    }

    /// Create in-memory store (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.create_schema()?;
        Ok(store)
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    fn create_schema(&self) -> StoreResult<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
                CREATE TABLE IF NOT EXISTS tasks (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    cron_spec TEXT NOT NULL DEFAULT '',
                    status TEXT NOT NULL DEFAULT 'unknown',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE INDEX IF NOT EXISTS idx_tasks_status
                    ON tasks(status);
                "#,
        )?;

        Ok(())
    }

    /// Insert a new task
    pub fn insert(&self, task: &Task) -> StoreResult<()> {
        let conn = self.conn()?;
        let result = conn.execute(
            r#"
                INSERT INTO tasks (id, name, cron_spec, status, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
            params![
                task.id as i64,
                task.name,
                task.cron_spec,
                task.status.as_str(),
                task.created_at.to_rfc3339(),
                task.updated_at.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::AlreadyExists(task.id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// List all tasks ordered by id
    pub fn list(&self) -> StoreResult<Vec<Task>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, name, cron_spec, status, created_at, updated_at FROM tasks ORDER BY id",
        )?;

        let tasks = stmt
            .query_map([], row_to_task)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tasks)
    }

    fn load_sync(&self, id: u64) -> StoreResult<Task> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, name, cron_spec, status, created_at, updated_at FROM tasks WHERE id = ?1",
            params![id as i64],
            row_to_task,
        )
        .optional()?
        .ok_or(StoreError::NotFound(id))
    }

    fn update_status_sync(&self, id: u64, status: TaskStatus) -> StoreResult<()> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE tasks SET status = ?1, updated_at = ?2 WHERE id = ?3",
            params![status.as_str(), Utc::now().to_rfc3339(), id as i64],
        )?;

        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_task(row: &rusqlite::Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get::<_, i64>(0)? as u64,
        name: row.get(1)?,
        cron_spec: row.get(2)?,
        status: row
            .get::<_, String>(3)?
            .parse()
            .unwrap_or(TaskStatus::Unknown),
        created_at: parse_timestamp(&row.get::<_, String>(4)?),
        updated_at: parse_timestamp(&row.get::<_, String>(5)?),
    })
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn load_by_id(&self, id: u64) -> StoreResult<Task> {
        self.load_sync(id)
    }

    async fn update_status(&self, id: u64, status: TaskStatus) -> StoreResult<()> {
        self.update_status_sync(id, status)
    }
}

// ============================================================================
// In-memory Implementation
// ============================================================================

/// In-memory implementation of TaskStore
///
/// Useful for tests and ephemeral runs without a database file.
#[derive(Default)]
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<u64, Task>>,
}

impl InMemoryTaskStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with tasks
    pub fn with_tasks(tasks: impl IntoIterator<Item = Task>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.tasks.write() {
            map.extend(tasks.into_iter().map(|t| (t.id, t)));
        }
        store
    }

    /// Insert or replace a task
    pub fn upsert(&self, task: Task) -> StoreResult<()> {
        let mut tasks = self.tasks.write().map_err(|_| StoreError::Poisoned)?;
        tasks.insert(task.id, task);
        Ok(())
    }

    /// Number of stored tasks
    pub fn len(&self) -> usize {
        self.tasks.read().map(|t| t.len()).unwrap_or(0)
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn load_by_id(&self, id: u64) -> StoreResult<Task> {
        let tasks = self.tasks.read().map_err(|_| StoreError::Poisoned)?;
        tasks.get(&id).cloned().ok_or(StoreError::NotFound(id))
    }

    async fn update_status(&self, id: u64, status: TaskStatus) -> StoreResult<()> {
        let mut tasks = self.tasks.write().map_err(|_| StoreError::Poisoned)?;
        let task = tasks.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        task.status = status;
        task.updated_at = Utc::now();
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
