//! Unified error handling for the taskhub crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`TaskhubErrorTrait`] - Common interface implemented by the unified error
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust,ignore
//! use taskhub::error::{Error, ErrorCategory, TaskhubErrorTrait};
//!
//! fn handle_error(err: Error) {
//!     if err.is_recoverable() {
//!         println!("Retrying: {}", err);
//!     } else {
//!         eprintln!("Fatal error: {}", err);
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

// Re-export domain-specific errors for convenience
pub use crate::coordinator::error::RestartError;
pub use crate::coordinator::service::RestartServiceError;
pub use crate::crawler::CrawlError;
pub use crate::scheduler::error::SchedulerError;
pub use crate::storage::StoreError;

/// Common trait for taskhub error types
pub trait TaskhubErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Storage and I/O errors
    Storage,
    /// Scheduler and timing errors
    Scheduler,
    /// Crawl job errors
    Crawl,
    /// Restart workflow errors
    Restart,
    /// Configuration and validation errors
    Config,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    /// Short description for the category
    pub fn description(&self) -> &'static str {
        match self {
            Self::Storage => "storage error",
            Self::Scheduler => "scheduler error",
            Self::Crawl => "crawl error",
            Self::Restart => "restart error",
            Self::Config => "configuration error",
            Self::Other => "other error",
        }
    }
}

/// Unified error type for the taskhub crate
#[derive(Error, Debug)]
pub enum Error {
    /// Task store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Scheduler and timing errors
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    /// Crawl engine errors
    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    /// Job restart errors
    #[error("Restart service error: {0}")]
    RestartService(#[from] RestartServiceError),

    /// Restart workflow errors
    #[error("Restart error: {0}")]
    Restart(#[from] RestartError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl TaskhubErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Store(e) => matches!(e, StoreError::Database(_) | StoreError::Io(_)),
            Self::Scheduler(e) => e.is_recoverable(),
            Self::Crawl(e) => e.is_recoverable(),
            Self::RestartService(RestartServiceError::Schedule(e)) => e.is_recoverable(),
            Self::RestartService(RestartServiceError::Crawl(e)) => e.is_recoverable(),
            Self::Restart(e) => e.is_recoverable(),
            Self::Io(_) => true, // I/O errors are often transient
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Store(_) | Self::Io(_) => ErrorCategory::Storage,
            Self::Scheduler(_) => ErrorCategory::Scheduler,
            Self::Crawl(_) => ErrorCategory::Crawl,
            Self::RestartService(_) | Self::Restart(_) => ErrorCategory::Restart,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: err.to_string(),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
