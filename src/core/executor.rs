//! Task execution trait.

use async_trait::async_trait;
use serde_json::Value;

use super::{AppResult, TaskMetadata};

/// Abstraction for running a task's payload and producing a result.
///
/// The executor is the business logic of the system ("run an agent", "scan a
/// file"); the broker only decides when it runs. It is called once per
/// attempt, so a task with `max_retries = 2` may see up to three calls with
/// the same `meta.id` and increasing `meta.retries`.
///
/// Returning `Err` (or panicking) fails the attempt. Cancellation and
/// timeouts drop the in-flight future at its next `.await`.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use prometheus_agent_broker::core::{AppResult, TaskExecutor, TaskMetadata};
/// use serde_json::{json, Value};
///
/// struct EchoExecutor;
///
/// #[async_trait]
/// impl TaskExecutor for EchoExecutor {
///     async fn execute(&self, payload: Value, meta: TaskMetadata) -> AppResult<Value> {
///         Ok(json!({ "action": meta.action, "echo": payload }))
///     }
/// }
/// ```
#[async_trait]
pub trait TaskExecutor: Send + Sync + 'static {
    /// Execute one attempt of a task.
    async fn execute(&self, payload: Value, meta: TaskMetadata) -> AppResult<Value>;
}
