//! Error types for the news fetcher.
//!
//! Two layers of errors live here:
//!
//! - [`AttemptFailure`]: why a single HTTP attempt did not succeed. These are
//!   transient by definition and are consumed by the retry loop in
//!   [`crate::api::client`]; callers only ever see one wrapped inside
//!   [`Error::RequestExhausted`].
//! - [`Error`]: terminal failures that propagate to callers.

use crate::tasks::TaskId;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for news fetcher operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Why one HTTP attempt failed. Every variant is retried identically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttemptFailure {
    /// Connection error, timeout, or a non-2xx status.
    #[error("network failure: {0}")]
    Network(String),

    /// The response body was not valid JSON.
    #[error("decode failure: {0}")]
    Decode(String),

    /// The response decoded but the validator rejected it.
    #[error("validation failure: {0}")]
    Validation(String),
}

/// Main error type for the news fetcher.
#[derive(Debug, Error)]
pub enum Error {
    /// Every attempt of a request failed.
    #[error("request exhausted after {attempts} attempts: {last}")]
    RequestExhausted {
        /// Total number of attempts made.
        attempts: u32,
        /// The failure of the final attempt.
        last: AttemptFailure,
    },

    /// The validator rejected a response and the client is set to fail fast.
    #[error("response rejected by validator: {0}")]
    ValidationRejected(String),

    /// The request could not be built (unsupported method, bad URL, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No task with this id was ever issued by the registry.
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// A wait on a task timed out. The task itself keeps running.
    #[error("task {task_id} did not complete within {timeout:?}")]
    DeadlineExceeded {
        /// The task that was being waited on.
        task_id: TaskId,
        /// How long the caller was willing to wait.
        timeout: Duration,
    },

    /// A task finished in the failed state; `reason` is its recorded error.
    #[error("task {task_id} failed: {reason}")]
    TaskFailed {
        /// The task that failed.
        task_id: TaskId,
        /// Error message captured when the task finished.
        reason: String,
    },

    /// The registry no longer accepts work.
    #[error("task registry is shutting down")]
    ShuttingDown,

    /// Configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// SQLite operation failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML config file could not be parsed.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True when the error came out of the HTTP retry layer.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            Error::RequestExhausted { .. } | Error::ValidationRejected(_)
        )
    }
}
