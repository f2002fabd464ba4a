//! Error types for broker operations.

use std::time::Duration;

use thiserror::Error;

use crate::util::serde::TaskId;

/// Errors produced by broker components.
///
/// The first four variants are the per-task failure taxonomy; their `Display`
/// text is what lands in a result summary's `error` field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BrokerError {
    /// The executor did not finish within the task's timeout.
    #[error("execution timed out after {0:?}")]
    ExecutionTimeout(Duration),
    /// The executor returned an error or panicked.
    #[error("execution failed: {0}")]
    ExecutionFailure(String),
    /// The task was cancelled by a caller or by broker shutdown.
    #[error("task cancelled")]
    Cancelled,
    /// The caller's wait budget elapsed before a terminal result appeared.
    #[error("timed out waiting for result of task {0}")]
    ResultWaitTimeout(TaskId),
    /// The broker has not been started, or has been stopped.
    #[error("broker is not running")]
    NotRunning,
    /// `start` was called on a broker that is already running.
    #[error("broker is already running")]
    AlreadyRunning,
    /// Strict mode rejected a resource class that was never registered.
    #[error("unknown resource class: {0}")]
    UnknownResourceClass(String),
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Application-facing result using anyhow for higher-level contexts.
///
/// Executors report failures through this type.
pub type AppResult<T> = Result<T, anyhow::Error>;
