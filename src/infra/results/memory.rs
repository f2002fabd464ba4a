//! In-memory result store with TTL eviction.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::TaskStatus;
use crate::util::serde::TaskId;

/// Outcome of a task as seen by callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSummary {
    /// Terminal status.
    pub status: TaskStatus,
    /// Task identifier.
    pub task_id: TaskId,
    /// Executor output, set when completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure description, set for failed, timed out and cancelled tasks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Duration of the successful attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<Duration>,
    /// When the final attempt started; `None` if the task never ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at_ms: Option<u128>,
    /// When the task reached its terminal status.
    pub completed_at_ms: u128,
    /// When the summary was written, milliseconds since epoch. Drives TTL eviction.
    pub created_at_ms: u128,
}

impl ResultSummary {
    /// Summary of a successful run. Written at `completed_at_ms`.
    #[must_use]
    pub fn completed(
        task_id: TaskId,
        result: Value,
        execution_time: Duration,
        started_at_ms: u128,
        completed_at_ms: u128,
    ) -> Self {
        Self {
            status: TaskStatus::Completed,
            task_id,
            result: Some(result),
            error: None,
            execution_time: Some(execution_time),
            started_at_ms: Some(started_at_ms),
            completed_at_ms,
            created_at_ms: completed_at_ms,
        }
    }

    /// Summary of a task that ended without a result. Written at
    /// `completed_at_ms`.
    #[must_use]
    pub fn errored(
        status: TaskStatus,
        task_id: TaskId,
        error: impl Into<String>,
        started_at_ms: Option<u128>,
        completed_at_ms: u128,
    ) -> Self {
        Self {
            status,
            task_id,
            result: None,
            error: Some(error.into()),
            execution_time: None,
            started_at_ms,
            completed_at_ms,
            created_at_ms: completed_at_ms,
        }
    }
}

/// Terminal results keyed by task id.
#[derive(Debug, Default)]
pub struct InMemoryResultStore {
    entries: HashMap<TaskId, ResultSummary>,
}

impl InMemoryResultStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a summary, replacing any previous one for the same task.
    pub fn deliver(&mut self, summary: ResultSummary) {
        self.entries.insert(summary.task_id, summary);
    }

    /// Read a summary without consuming it.
    #[must_use]
    pub fn peek(&self, id: &TaskId) -> Option<&ResultSummary> {
        self.entries.get(id)
    }

    /// Remove and return a summary.
    pub fn take(&mut self, id: &TaskId) -> Option<ResultSummary> {
        self.entries.remove(id)
    }

    /// Drop summaries created more than `ttl` before `now_ms`.
    ///
    /// Returns the number of evicted entries.
    pub fn evict_expired(&mut self, now_ms: u128, ttl: Duration) -> usize {
        let before = self.entries.len();
        let cutoff = now_ms.saturating_sub(ttl.as_millis());
        self.entries.retain(|_, s| s.created_at_ms >= cutoff);
        before - self.entries.len()
    }

    /// Number of stored summaries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
