// Core data structures for taskhub

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a crawl task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Unknown,
    Running,
    Stopped,
    UnexpectedExit,
    Completed,
    RunningTimeout,
}

impl TaskStatus {
    /// Stable string form used for persistence
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::UnexpectedExit => "unexpected_exit",
            Self::Completed => "completed",
            Self::RunningTimeout => "running_timeout",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TaskStatus {
    /// Parse a status string, returning `None` for anything unrecognised
    pub fn from_known(s: &str) -> Option<Self> {
        match s {
            "unknown" => Some(Self::Unknown),
            "running" => Some(Self::Running),
            "stopped" => Some(Self::Stopped),
            "unexpected_exit" => Some(Self::UnexpectedExit),
            "completed" => Some(Self::Completed),
            "running_timeout" => Some(Self::RunningTimeout),
            _ => None,
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = std::convert::Infallible;

    /// Lenient parse used when reading stored rows; unrecognised values become `Unknown`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_known(s).unwrap_or_default())
    }
}

/// A crawl task as persisted by the task store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: u64,
    pub name: String,
    /// Cron expression; empty for one-shot tasks
    pub cron_spec: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a task with fresh timestamps
    pub fn new(id: u64, name: impl Into<String>, cron_spec: impl Into<String>, status: TaskStatus) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            cron_spec: cron_spec.into(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the task runs on a cron schedule
    ///
    /// Any non-empty expression counts; it is not parsed here.
    pub fn is_recurring(&self) -> bool {
        !self.cron_spec.is_empty()
    }

    /// Whether the persisted status allows a restart
    pub fn can_restart(&self) -> bool {
        self.status == TaskStatus::Stopped
    }
}
