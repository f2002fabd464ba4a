//! Dispatcher and cleanup loops.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{execution, BrokerInner, RunningTask};
use crate::core::{AuditAction, OrderKey, TaskExecutor, TaskStatus};
use crate::util::clock::now_ms;

/// Dispatch until shutdown.
///
/// After a successful dispatch the loop tries again straight away; when
/// nothing is eligible it waits for a wake-up or the idle interval.
pub(super) async fn dispatch_loop(
    inner: Arc<BrokerInner>,
    executor: Arc<dyn TaskExecutor>,
    shutdown: CancellationToken,
) {
    let idle = inner.config.dispatch_interval();
    debug!(?idle, "dispatcher started");

    while !shutdown.is_cancelled() {
        if dispatch_next(&inner, &executor, &shutdown) {
            tokio::task::yield_now().await;
            continue;
        }
        tokio::select! {
            () = shutdown.cancelled() => break,
            () = inner.wake.notified() => {}
            () = tokio::time::sleep(idle) => {}
        }
    }

    debug!("dispatcher stopped");
}

/// Pick, pop and spawn at most one task. Returns whether one was dispatched.
fn dispatch_next(
    inner: &Arc<BrokerInner>,
    executor: &Arc<dyn TaskExecutor>,
    shutdown: &CancellationToken,
) -> bool {
    let config = &inner.config;
    let mut state = inner.state.lock();
    if shutdown.is_cancelled() || state.running.len() >= config.max_concurrent {
        return false;
    }

    let queues = inner.queues.read();
    let mut best: Option<(OrderKey, &String)> = None;
    for (class, queue) in queues.iter() {
        if state.running_in(class) >= config.class_limit(class) {
            continue;
        }
        let Some(key) = queue.lock().peek_key() else {
            continue;
        };
        if best.is_none_or(|(best_key, _)| key < best_key) {
            best = Some((key, class));
        }
    }
    let Some((_, class)) = best else {
        return false;
    };
    let resource_class = class.clone();
    let Some(mut task) = queues
        .get(&resource_class)
        .and_then(|queue| queue.lock().get())
    else {
        return false;
    };
    drop(queues);

    let started_at_ms = now_ms();
    task.status = TaskStatus::Running;
    task.started_at_ms = Some(started_at_ms);
    let id = task.id();
    let cancel = shutdown.child_token();
    state.register(
        id,
        RunningTask {
            resource_class: resource_class.clone(),
            cancel: cancel.clone(),
            started_at_ms,
        },
    );
    let running = state.running.len();
    drop(state);

    inner.record_audit(
        id,
        &resource_class,
        AuditAction::Dispatch,
        (task.meta.retries > 0).then(|| format!("retry {}", task.meta.retries)),
    );
    info!(
        task_id = %id,
        resource_class = %resource_class,
        priority = %task.meta.priority,
        retries = task.meta.retries,
        running,
        "task dispatched"
    );

    tokio::spawn(execution::run_task(
        Arc::clone(inner),
        Arc::clone(executor),
        task,
        cancel,
    ));
    true
}

/// Evict expired results until shutdown.
pub(super) async fn cleanup_loop(inner: Arc<BrokerInner>, shutdown: CancellationToken) {
    let ttl = inner.config.result_ttl();
    let mut ticker = tokio::time::interval(inner.config.cleanup_interval());
    // First tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = inner.results.lock().evict_expired(now_ms(), ttl);
                if evicted > 0 {
                    info!(evicted, "evicted expired results");
                } else {
                    debug!("result cleanup found nothing to evict");
                }
            }
        }
    }

    debug!("cleanup loop stopped");
}
