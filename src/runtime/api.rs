//! API-facing request/response models.
//!
//! These are the shapes an HTTP or WebSocket layer would exchange; no
//! transport is provided here.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::{Broker, BrokerError, TaskRequest, TaskStatus};
use crate::infra::ResultSummary;
use crate::util::serde::{Priority, TaskId};

/// Task submission payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSubmission {
    /// Resource class ("agent type").
    #[serde(alias = "agent_type")]
    pub resource_class: String,
    /// Action name.
    pub action: String,
    /// Executor payload.
    #[serde(default)]
    pub payload: Value,
    /// Caller context.
    #[serde(default)]
    pub context: Value,
    /// Priority, `normal` if omitted.
    #[serde(default)]
    pub priority: Priority,
    /// Per-attempt timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Retry budget.
    pub max_retries: Option<u32>,
}

impl From<TaskSubmission> for TaskRequest {
    fn from(req: TaskSubmission) -> Self {
        let mut request = Self::new(req.resource_class, req.action)
            .with_payload(req.payload)
            .with_context(req.context)
            .with_priority(req.priority);
        if let Some(secs) = req.timeout_secs {
            request = request.with_timeout(Duration::from_secs(secs));
        }
        if let Some(max_retries) = req.max_retries {
            request = request.with_max_retries(max_retries);
        }
        request
    }
}

/// Task status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusResponse {
    /// Task identifier.
    pub task_id: TaskId,
    /// Current status, `None` if unknown or evicted.
    pub status: Option<TaskStatus>,
    /// Terminal result, when available.
    pub result: Option<ResultSummary>,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag: the broker is started.
    pub ok: bool,
    /// Live queued tasks.
    pub queued: usize,
    /// Running tasks.
    pub running: usize,
}

/// Submit a task to the broker.
///
/// # Errors
///
/// Propagates `enqueue` errors.
pub fn submit_task(broker: &Broker, req: TaskSubmission) -> Result<TaskId, BrokerError> {
    broker.enqueue(req.into())
}

/// Current status of a task plus its result if terminal.
#[must_use]
pub fn task_status(broker: &Broker, task_id: TaskId) -> TaskStatusResponse {
    TaskStatusResponse {
        task_id,
        status: broker.get_status(task_id),
        result: broker.try_get_result(task_id),
    }
}

/// Return a health payload.
#[must_use]
pub fn health(broker: &Broker) -> Health {
    let stats = broker.get_queue_stats();
    Health {
        ok: broker.is_running(),
        queued: stats.queued,
        running: stats.running,
    }
}
