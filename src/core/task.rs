//! Task records, lifecycle status and the dispatch ordering key.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::util::serde::{Priority, TaskId};

/// Status of a task in the broker lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Waiting in its resource queue.
    Queued,
    /// Handed to the executor.
    Running,
    /// Executor returned a result.
    Completed,
    /// Executor failed; terminal once retries are exhausted.
    Failed,
    /// Cancelled while queued or running.
    Cancelled,
    /// Executor exceeded the task timeout; terminal once retries are exhausted.
    Timeout,
}

impl TaskStatus {
    /// Whether a stored task in this status will never transition again.
    ///
    /// `Failed` and `Timeout` are only ever stored once retries are spent.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Timeout
        )
    }

    /// Lowercase label, matching the serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callback invoked once with the result of a completed task.
pub type CompletionCallback = Arc<dyn Fn(&Value) + Send + Sync>;

/// Dispatch ordering key: priority rank, then enqueue sequence. Smaller keys
/// are served first.
///
/// The sequence is assigned in creation order and, unlike the wall clock,
/// never steps backwards, so it is the FIFO tie-break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderKey {
    /// [`Priority::rank`] of the task.
    pub rank: u8,
    /// Broker-wide enqueue sequence.
    pub seq: u64,
}

/// Metadata describing a task, handed to the executor on every attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Unique task identifier, stable across retries.
    pub id: TaskId,
    /// Resource class the task is queued under.
    pub resource_class: String,
    /// Action name interpreted by the executor.
    pub action: String,
    /// Opaque caller context.
    pub context: Value,
    /// Priority used for queue ordering.
    pub priority: Priority,
    /// Creation timestamp in milliseconds since epoch. Informational only.
    pub created_at_ms: u128,
    /// Enqueue sequence number.
    pub seq: u64,
    /// Retries already consumed.
    pub retries: u32,
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Per-attempt execution timeout.
    pub timeout: Duration,
}

impl TaskMetadata {
    /// Ordering key; unchanged by retries.
    #[must_use]
    pub const fn order_key(&self) -> OrderKey {
        OrderKey {
            rank: self.priority.rank(),
            seq: self.seq,
        }
    }
}

/// A task owned by its resource queue or, while running, by the broker.
#[derive(Clone)]
pub struct TaskRecord {
    /// Identity and scheduling metadata.
    pub meta: TaskMetadata,
    /// Payload passed to the executor.
    pub payload: Value,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// When the latest attempt started.
    pub started_at_ms: Option<u128>,
    /// When the task reached a terminal status.
    pub completed_at_ms: Option<u128>,
    /// Executor output once completed.
    pub result: Option<Value>,
    /// Failure description of the latest attempt.
    pub error: Option<String>,
    /// Optional completion callback.
    pub callback: Option<CompletionCallback>,
}

impl TaskRecord {
    /// Build a fresh `Queued` record.
    #[must_use]
    pub fn new(meta: TaskMetadata, payload: Value, callback: Option<CompletionCallback>) -> Self {
        Self {
            meta,
            payload,
            status: TaskStatus::Queued,
            started_at_ms: None,
            completed_at_ms: None,
            result: None,
            error: None,
            callback,
        }
    }

    /// Task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.meta.id
    }

    /// Ordering key of the underlying metadata.
    #[must_use]
    pub const fn order_key(&self) -> OrderKey {
        self.meta.order_key()
    }

    /// Whether another attempt is allowed after a failure or timeout.
    #[must_use]
    pub const fn can_retry(&self) -> bool {
        self.meta.retries < self.meta.max_retries
    }
}

impl fmt::Debug for TaskRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRecord")
            .field("meta", &self.meta)
            .field("status", &self.status)
            .field("started_at_ms", &self.started_at_ms)
            .field("completed_at_ms", &self.completed_at_ms)
            .field("error", &self.error)
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}

/// Arguments for [`Broker::enqueue`](crate::core::Broker::enqueue).
///
/// Unset timeout and retry budget fall back to the broker configuration.
#[derive(Clone)]
pub struct TaskRequest {
    /// Resource class ("agent type") to queue under.
    pub resource_class: String,
    /// Action name interpreted by the executor.
    pub action: String,
    /// Executor payload.
    pub payload: Value,
    /// Opaque caller context.
    pub context: Value,
    /// Queue priority.
    pub priority: Priority,
    /// Per-attempt timeout override.
    pub timeout: Option<Duration>,
    /// Retry budget override.
    pub max_retries: Option<u32>,
    /// Completion callback.
    pub callback: Option<CompletionCallback>,
}

impl TaskRequest {
    /// Request with `Normal` priority, null payload and context.
    pub fn new(resource_class: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource_class: resource_class.into(),
            action: action.into(),
            payload: Value::Null,
            context: Value::Null,
            priority: Priority::Normal,
            timeout: None,
            max_retries: None,
            callback: None,
        }
    }

    /// Set the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the caller context.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    /// Set the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Override the per-attempt timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the retry budget.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Attach a completion callback.
    #[must_use]
    pub fn with_callback<F>(mut self, callback: F) -> Self
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }
}

impl fmt::Debug for TaskRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskRequest")
            .field("resource_class", &self.resource_class)
            .field("action", &self.action)
            .field("priority", &self.priority)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("has_callback", &self.callback.is_some())
            .finish_non_exhaustive()
    }
}
