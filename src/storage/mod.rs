//! Task persistence
//!
//! This module handles task storage with SQLite for durable deployments
//! and an in-memory map for tests and ephemeral runs.

pub mod repository;

pub use repository::{
    InMemoryTaskStore, SharedTaskStore, SqliteTaskStore, StoreError, StoreResult, TaskStore,
};
