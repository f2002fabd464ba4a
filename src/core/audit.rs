//! Audit trail of task lifecycle transitions.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::util::clock::now_ms;
use crate::util::serde::TaskId;

/// Lifecycle transition recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Accepted into a resource queue.
    Enqueue,
    /// Popped and handed to the executor.
    Dispatch,
    /// Finished with a result.
    Complete,
    /// Failed or timed out and went back to its queue.
    Retry,
    /// Failed with retries exhausted.
    Fail,
    /// Timed out with retries exhausted.
    Timeout,
    /// Cancelled while queued or running.
    Cancel,
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Enqueue => "enqueue",
            Self::Dispatch => "dispatch",
            Self::Complete => "complete",
            Self::Retry => "retry",
            Self::Fail => "fail",
            Self::Timeout => "timeout",
            Self::Cancel => "cancel",
        };
        f.write_str(label)
    }
}

/// Audit event structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Event identifier.
    pub event_id: String,
    /// Related task identifier.
    pub task_id: TaskId,
    /// Resource class of the task.
    pub resource_class: String,
    /// Transition taken.
    pub action: AuditAction,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
    /// Additional context, e.g. an error message.
    pub detail: Option<String>,
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

impl<T: AuditSink + ?Sized> AuditSink for Box<T> {
    fn record(&mut self, event: AuditEvent) {
        (**self).record(event);
    }
}

/// In-memory audit sink for testing and dev.
///
/// Clones share one bounded buffer, so a clone kept by the caller observes
/// events recorded through the broker.
#[derive(Clone)]
pub struct InMemoryAuditSink {
    events: Arc<Mutex<VecDeque<AuditEvent>>>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a new in-memory sink with a bounded buffer.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::with_capacity(max_events))),
            max_events,
        }
    }

    /// Retrieve a snapshot of stored events.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().iter().cloned().collect()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        let mut events = self.events.lock();
        if events.len() >= self.max_events {
            events.pop_front();
        }
        events.push_back(event);
    }
}

/// Helper to build an audit event stamped with the current time.
pub fn build_audit_event(
    task_id: TaskId,
    resource_class: impl Into<String>,
    action: AuditAction,
    detail: Option<String>,
) -> AuditEvent {
    let created_at_ms = now_ms();
    AuditEvent {
        event_id: uuid::Uuid::new_v4().to_string(),
        task_id,
        resource_class: resource_class.into(),
        action,
        created_at_ms,
        detail,
    }
}
