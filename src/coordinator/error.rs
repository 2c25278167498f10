//! Restart errors and outcomes
//!
//! Every failure of a restart is classified as a [`RestartError`] and then
//! collapsed into a [`RestartOutcome`] at the coordinator boundary.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::models::TaskStatus;
use crate::storage::StoreError;

use super::service::RestartServiceError;

/// Message returned when a restart for the task is already in flight
pub const ALREADY_RUNNING_MESSAGE: &str = "task is already running";

/// Body returned on a successful restart
pub const SUCCESS_MESSAGE: &str = "success";

/// Why a task may not be restarted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ineligibility {
    /// Task has no cron spec
    NotRecurring,
    /// Persisted status is not `Stopped`
    StatusForbidsRestart(TaskStatus),
}

impl fmt::Display for Ineligibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRecurring => write!(f, "not a recurring task"),
            Self::StatusForbidsRestart(status) => {
                write!(f, "status does not permit restart (status: {status})")
            }
        }
    }
}

/// Failure of a single restart attempt
#[derive(Error, Debug)]
pub enum RestartError {
    /// Task id missing or not a base-10 unsigned integer
    #[error("invalid task id: {raw:?}")]
    MalformedInput { raw: String },

    /// Another restart for the task holds the lock
    #[error("task {task_id} is already running")]
    Conflict { task_id: u64 },

    /// Task state does not allow a restart
    #[error("task {task_id} cannot be restarted: {reason}")]
    NotEligible { task_id: u64, reason: Ineligibility },

    /// Task could not be read
    #[error("failed to load task {task_id}: {source}")]
    LoadFailure {
        task_id: u64,
        #[source]
        source: StoreError,
    },

    /// Cron or crawl job could not be started
    #[error("failed to start jobs for task {task_id}: {source}")]
    InvocationFailure {
        task_id: u64,
        #[source]
        source: RestartServiceError,
    },

    /// Jobs were started but the status write failed
    #[error("failed to commit status for task {task_id}: {source}")]
    CommitFailure {
        task_id: u64,
        #[source]
        source: StoreError,
    },

    /// The restart deadline expired
    #[error("restart of task {task_id} timed out after {after:?}")]
    Timeout { task_id: u64, after: Duration },
}

impl RestartError {
    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MalformedInput { .. } | Self::NotEligible { .. } => 400,
            Self::Conflict { .. } => 409,
            Self::LoadFailure { .. }
            | Self::InvocationFailure { .. }
            | Self::CommitFailure { .. }
            | Self::Timeout { .. } => 500,
        }
    }

    /// Whether the caller is at fault
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Whether retrying the same request later may succeed
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Conflict { .. } | Self::CommitFailure { .. } | Self::Timeout { .. }
        )
    }
}

/// Result of one restart request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartOutcome {
    Success,
    Conflict(String),
    BadRequest(String),
    InternalError(String),
}

impl RestartOutcome {
    /// HTTP status code for the outcome
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Success => 200,
            Self::Conflict(_) => 409,
            Self::BadRequest(_) => 400,
            Self::InternalError(_) => 500,
        }
    }

    /// Short label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad_request",
            Self::InternalError(_) => "internal_error",
        }
    }

    /// Human-readable message
    pub fn message(&self) -> &str {
        match self {
            Self::Success => SUCCESS_MESSAGE,
            Self::Conflict(msg) | Self::BadRequest(msg) | Self::InternalError(msg) => msg,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<&RestartError> for RestartOutcome {
    fn from(err: &RestartError) -> Self {
        match err {
            RestartError::Conflict { .. } => Self::Conflict(ALREADY_RUNNING_MESSAGE.to_string()),
            RestartError::MalformedInput { .. } => Self::BadRequest(err.to_string()),
            RestartError::NotEligible { reason, .. } => Self::BadRequest(reason.to_string()),
            _ => Self::InternalError(err.to_string()),
        }
    }
}

impl From<Result<(), RestartError>> for RestartOutcome {
    fn from(result: Result<(), RestartError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(e) => Self::from(&e),
        }
    }
}
