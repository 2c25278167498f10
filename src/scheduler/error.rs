//! Error types for the scheduler module

use std::fmt;

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Scheduler-specific errors
#[derive(Debug)]
pub enum SchedulerError {
    /// Task has no usable cron expression
    InvalidCronSpec {
        task_id: u64,
        spec: String,
    },

    /// Tick interval must be positive
    InvalidInterval {
        secs: u64,
    },

    /// Scheduler no longer accepts jobs
    ShuttingDown,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCronSpec { task_id, spec } => {
                write!(f, "Invalid cron spec '{}' for task {}", spec, task_id)
            }
            Self::InvalidInterval { secs } => {
                write!(f, "Invalid tick interval {}s. Must be greater than 0", secs)
            }
            Self::ShuttingDown => write!(f, "Scheduler is shutting down"),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl SchedulerError {
    /// Create an invalid cron spec error
    pub fn invalid_cron_spec(task_id: u64, spec: impl Into<String>) -> Self {
        Self::InvalidCronSpec {
            task_id,
            spec: spec.into(),
        }
    }

    /// Check if the error is recoverable
    pub fn is_recoverable(&self) -> bool {
        false
    }
}
