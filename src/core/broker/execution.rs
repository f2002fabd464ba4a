//! Execution of one dispatched task and its outcome bookkeeping.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::BrokerInner;
use crate::core::{AuditAction, BrokerError, CompletionCallback, TaskExecutor, TaskRecord, TaskStatus};
use crate::infra::ResultSummary;
use crate::util::clock::now_ms;

/// How one attempt ended.
#[derive(Debug)]
enum Outcome {
    Completed(Value),
    Failed(String),
    TimedOut,
    Cancelled,
}

/// Run one attempt of `task` and record what happened.
///
/// The executor runs in its own tokio task so a panic surfaces as a join
/// error instead of unwinding through the broker.
pub(super) async fn run_task(
    inner: Arc<BrokerInner>,
    executor: Arc<dyn TaskExecutor>,
    task: TaskRecord,
    cancel: CancellationToken,
) {
    let timeout = task.meta.timeout;
    let payload = task.payload.clone();
    let meta = task.meta.clone();
    let started = Instant::now();

    let mut handle = tokio::spawn(async move { executor.execute(payload, meta).await });
    let outcome = tokio::select! {
        biased;
        () = cancel.cancelled() => Outcome::Cancelled,
        joined = tokio::time::timeout(timeout, &mut handle) => match joined {
            Err(_) => Outcome::TimedOut,
            Ok(Ok(Ok(value))) => Outcome::Completed(value),
            Ok(Ok(Err(e))) => Outcome::Failed(format!("{e:#}")),
            Ok(Err(e)) => Outcome::Failed(e.to_string()),
        },
    };
    // No-op if the attempt already finished.
    handle.abort();

    finish(&inner, task, outcome, &cancel, started.elapsed());
}

/// Apply an attempt's outcome: write a result, or put the task back.
fn finish(
    inner: &BrokerInner,
    mut task: TaskRecord,
    outcome: Outcome,
    cancel: &CancellationToken,
    elapsed: Duration,
) {
    let id = task.id();
    let resource_class = task.meta.resource_class.clone();
    let mut callback: Option<(CompletionCallback, Value)> = None;

    let mut state = inner.state.lock();
    // `cancel_task` cancels under this lock, so once it has returned `true`
    // the attempt settles as cancelled whatever the executor did.
    let outcome = if cancel.is_cancelled() {
        Outcome::Cancelled
    } else {
        outcome
    };
    let started_at_ms = task.started_at_ms;
    match outcome {
        Outcome::Completed(value) => {
            let now = now_ms();
            task.status = TaskStatus::Completed;
            task.completed_at_ms = Some(now);
            inner.results.lock().deliver(ResultSummary::completed(
                id,
                value.clone(),
                elapsed,
                started_at_ms.unwrap_or(now),
                now,
            ));
            inner.counters.completed.fetch_add(1, Ordering::Relaxed);
            inner.record_audit(id, &resource_class, AuditAction::Complete, None);
            info!(task_id = %id, resource_class = %resource_class, ?elapsed, "task completed");
            callback = task.callback.take().map(|cb| (cb, value.clone()));
            task.result = Some(value);
            debug!(record = ?task, "terminal record dropped");
        }
        Outcome::Failed(reason) => {
            let err = BrokerError::ExecutionFailure(reason);
            retry_or_settle(inner, task, TaskStatus::Failed, &err);
        }
        Outcome::TimedOut => {
            let err = BrokerError::ExecutionTimeout(task.meta.timeout);
            retry_or_settle(inner, task, TaskStatus::Timeout, &err);
        }
        Outcome::Cancelled => {
            inner.results.lock().deliver(ResultSummary::errored(
                TaskStatus::Cancelled,
                id,
                BrokerError::Cancelled.to_string(),
                started_at_ms,
                now_ms(),
            ));
            inner.counters.cancelled.fetch_add(1, Ordering::Relaxed);
            inner.record_audit(
                id,
                &resource_class,
                AuditAction::Cancel,
                Some("running".into()),
            );
            info!(task_id = %id, resource_class = %resource_class, "running task cancelled");
        }
    }
    state.release(&id);
    drop(state);

    inner.wake.notify_one();

    if let Some((cb, value)) = callback {
        if catch_unwind(AssertUnwindSafe(|| cb(&value))).is_err() {
            warn!(task_id = %id, "completion callback panicked");
        }
    }
}

/// Requeue a failed or timed-out attempt if retries remain, else store the
/// terminal result. Caller holds the broker state lock.
fn retry_or_settle(inner: &BrokerInner, mut task: TaskRecord, status: TaskStatus, err: &BrokerError) {
    let id = task.id();
    let resource_class = task.meta.resource_class.clone();
    let message = err.to_string();

    if task.can_retry() {
        task.meta.retries += 1;
        task.status = status;
        task.error = Some(message.clone());
        let retries = task.meta.retries;
        inner.queue_for(&resource_class).lock().put(task);
        inner.counters.retried.fetch_add(1, Ordering::Relaxed);
        inner.record_audit(id, &resource_class, AuditAction::Retry, Some(message.clone()));
        warn!(
            task_id = %id,
            resource_class = %resource_class,
            retries,
            %status,
            error = %message,
            "attempt failed, task requeued"
        );
        return;
    }

    let (counter, action) = match status {
        TaskStatus::Timeout => (&inner.counters.timed_out, AuditAction::Timeout),
        TaskStatus::Failed => (&inner.counters.failed, AuditAction::Fail),
        other => {
            error!(task_id = %id, status = %other, "unexpected settle status");
            return;
        }
    };
    let completed_at_ms = now_ms();
    task.status = status;
    task.completed_at_ms = Some(completed_at_ms);
    task.error = Some(message.clone());
    inner.results.lock().deliver(ResultSummary::errored(
        status,
        id,
        message.clone(),
        task.started_at_ms,
        completed_at_ms,
    ));
    counter.fetch_add(1, Ordering::Relaxed);
    inner.record_audit(id, &resource_class, action, Some(message.clone()));
    warn!(
        task_id = %id,
        resource_class = %resource_class,
        retries = task.meta.retries,
        %status,
        error = %message,
        "task settled after exhausting retries"
    );
    debug!(record = ?task, "terminal record dropped");
}
