//! Task broker: per-class priority queues, a cross-queue dispatcher, and the
//! public lifecycle API.
//!
//! The broker owns one [`ResourceQueue`] per resource class ("agent type"),
//! a running registry, and a result store. A single dispatcher loop picks the
//! task with the smallest ordering key among classes that still have
//! capacity, so a class at its ceiling never blocks the others. This can let
//! a low-priority task in an idle class start ahead of a high-priority task in
//! a saturated one.
//!
//! # Locking
//!
//! Every lifecycle transition (dispatch, retry, terminal write, cancellation)
//! happens under the `state` mutex, so status lookups never observe a task
//! between structures. Lock order is `state` → `queues` → individual queue →
//! `results`; no lock is held across an `.await`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use prometheus_agent_broker::config::BrokerConfig;
//! use prometheus_agent_broker::core::{Broker, TaskRequest};
//! use prometheus_agent_broker::util::Priority;
//!
//! let broker = Broker::new(BrokerConfig::default().with_class("scout", 2))?;
//! broker.start(my_executor)?;
//!
//! let id = broker.enqueue(
//!     TaskRequest::new("scout", "scan").with_priority(Priority::Critical),
//! )?;
//! let summary = broker.get_result(id, Duration::from_secs(5)).await?;
//! broker.stop().await;
//! ```

mod dispatch;
mod execution;

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BrokerConfig;
use crate::core::{
    build_audit_event, AuditAction, AuditSink, BrokerError, TaskExecutor, TaskMetadata,
    TaskRecord, TaskRequest, TaskStatus,
};
use crate::infra::{InMemoryResultStore, QueuedTaskView, ResourceQueue, ResultSummary};
use crate::util::clock::now_ms;
use crate::util::serde::TaskId;

/// Upper bound on how long `stop` waits for cancelled executions to settle.
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Aggregate broker statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerStats {
    /// Tasks accepted by `enqueue`.
    pub enqueued: u64,
    /// Tasks that completed.
    pub completed: u64,
    /// Tasks that failed with retries exhausted.
    pub failed: u64,
    /// Tasks that timed out with retries exhausted.
    pub timed_out: u64,
    /// Tasks cancelled while queued or running.
    pub cancelled: u64,
    /// Attempts that were sent back to their queue.
    pub retried: u64,
    /// Live queued tasks across all classes.
    pub queued: usize,
    /// Tasks currently running across all classes.
    pub running: usize,
    /// Global concurrency ceiling.
    pub max_concurrent: usize,
    /// Per-class breakdown.
    pub classes: BTreeMap<String, ClassStats>,
}

/// Per-resource-class statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassStats {
    /// Live queued tasks.
    pub queued: usize,
    /// Running tasks.
    pub running: usize,
    /// Class concurrency ceiling.
    pub max_concurrent: usize,
}

/// Lifetime counters (lock-free atomics).
#[derive(Debug, Default)]
struct BrokerCounters {
    enqueued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
    cancelled: AtomicU64,
    retried: AtomicU64,
}

/// Registry entry for an executing task.
#[derive(Debug)]
struct RunningTask {
    resource_class: String,
    cancel: CancellationToken,
    started_at_ms: u128,
}

/// Running registry and per-class running counts.
#[derive(Debug, Default)]
struct BrokerState {
    running: HashMap<TaskId, RunningTask>,
    running_per_class: HashMap<String, usize>,
}

impl BrokerState {
    fn running_in(&self, resource_class: &str) -> usize {
        self.running_per_class
            .get(resource_class)
            .copied()
            .unwrap_or_default()
    }

    fn register(&mut self, id: TaskId, task: RunningTask) {
        *self
            .running_per_class
            .entry(task.resource_class.clone())
            .or_default() += 1;
        self.running.insert(id, task);
    }

    fn release(&mut self, id: &TaskId) {
        let Some(task) = self.running.remove(id) else {
            return;
        };
        if let Some(count) = self.running_per_class.get_mut(&task.resource_class) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                self.running_per_class.remove(&task.resource_class);
            }
        }
    }
}

/// Background loops owned by a started broker.
struct Lifecycle {
    shutdown: CancellationToken,
    loops: Vec<JoinHandle<()>>,
}

struct BrokerInner {
    config: BrokerConfig,
    state: Mutex<BrokerState>,
    queues: RwLock<HashMap<String, Arc<Mutex<ResourceQueue>>>>,
    results: Mutex<InMemoryResultStore>,
    counters: BrokerCounters,
    /// Wakes the dispatcher on enqueue and on execution completion.
    wake: Notify,
    seq: AtomicU64,
    audit: Mutex<Option<Box<dyn AuditSink>>>,
    lifecycle: Mutex<Option<Lifecycle>>,
}

impl BrokerInner {
    fn queue_for(&self, resource_class: &str) -> Arc<Mutex<ResourceQueue>> {
        if let Some(queue) = self.queues.read().get(resource_class) {
            return Arc::clone(queue);
        }
        let mut queues = self.queues.write();
        Arc::clone(queues.entry(resource_class.to_string()).or_insert_with(|| {
            debug!(resource_class, "created resource queue");
            Arc::new(Mutex::new(ResourceQueue::new(resource_class)))
        }))
    }

    fn record_audit(
        &self,
        task_id: TaskId,
        resource_class: &str,
        action: AuditAction,
        detail: Option<String>,
    ) {
        if let Some(sink) = self.audit.lock().as_mut() {
            sink.record(build_audit_event(task_id, resource_class, action, detail));
        }
    }
}

/// Priority task broker. Cloning yields another handle to the same broker.
#[derive(Clone)]
pub struct Broker {
    inner: Arc<BrokerInner>,
}

impl std::fmt::Debug for Broker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Broker")
            .field("config", &self.inner.config)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl Broker {
    /// Create a stopped broker.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::InvalidConfig` if the configuration is invalid.
    pub fn new(config: BrokerConfig) -> Result<Self, BrokerError> {
        config.validate().map_err(BrokerError::InvalidConfig)?;
        Ok(Self {
            inner: Arc::new(BrokerInner {
                config,
                state: Mutex::new(BrokerState::default()),
                queues: RwLock::new(HashMap::new()),
                results: Mutex::new(InMemoryResultStore::new()),
                counters: BrokerCounters::default(),
                wake: Notify::new(),
                seq: AtomicU64::new(0),
                audit: Mutex::new(None),
                lifecycle: Mutex::new(None),
            }),
        })
    }

    /// Attach an audit sink receiving every lifecycle transition.
    #[must_use]
    pub fn with_audit(self, sink: impl AuditSink + 'static) -> Self {
        *self.inner.audit.lock() = Some(Box::new(sink));
        self
    }

    /// Configuration in effect.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.inner.config
    }

    /// Whether `start` has been called and `stop` has not.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.lifecycle.lock().is_some()
    }

    /// Register the executor and launch the dispatcher and cleanup loops.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::AlreadyRunning` if the broker is started.
    pub fn start<E: TaskExecutor>(&self, executor: E) -> Result<(), BrokerError> {
        let mut lifecycle = self.inner.lifecycle.lock();
        if lifecycle.is_some() {
            return Err(BrokerError::AlreadyRunning);
        }

        let executor: Arc<dyn TaskExecutor> = Arc::new(executor);
        let shutdown = CancellationToken::new();
        let loops = vec![
            tokio::spawn(dispatch::dispatch_loop(
                Arc::clone(&self.inner),
                executor,
                shutdown.clone(),
            )),
            tokio::spawn(dispatch::cleanup_loop(
                Arc::clone(&self.inner),
                shutdown.clone(),
            )),
        ];
        *lifecycle = Some(Lifecycle { shutdown, loops });

        info!(
            max_concurrent = self.inner.config.max_concurrent,
            classes = self.inner.config.resource_classes.len(),
            "broker started"
        );
        Ok(())
    }

    /// Cancel in-flight executions and both background loops.
    ///
    /// Queued tasks stay queued. Waits briefly for cancelled executions to
    /// record their results. Calling `stop` on a stopped broker is a no-op.
    pub async fn stop(&self) {
        let Some(lifecycle) = self.inner.lifecycle.lock().take() else {
            return;
        };
        info!("stopping broker");
        lifecycle.shutdown.cancel();

        for handle in lifecycle.loops {
            if let Err(e) = handle.await {
                warn!(error = %e, "broker loop ended abnormally");
            }
        }

        let drained = tokio::time::timeout(STOP_GRACE, async {
            while self.running_count() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await;
        if drained.is_err() {
            warn!(
                running = self.running_count(),
                "executions still settling after stop"
            );
        }
        info!("broker stopped");
    }

    fn running_count(&self) -> usize {
        self.inner.state.lock().running.len()
    }

    /// Queue a task and return its id without waiting for capacity.
    ///
    /// Unknown resource classes get a queue on first use with the default
    /// class ceiling, unless `strict_resource_classes` is set.
    ///
    /// # Errors
    ///
    /// - `BrokerError::NotRunning` before `start` or after `stop`
    /// - `BrokerError::UnknownResourceClass` in strict mode
    pub fn enqueue(&self, request: TaskRequest) -> Result<TaskId, BrokerError> {
        if !self.is_running() {
            return Err(BrokerError::NotRunning);
        }
        let config = &self.inner.config;
        if !config.is_registered(&request.resource_class) {
            if config.strict_resource_classes {
                return Err(BrokerError::UnknownResourceClass(request.resource_class));
            }
            if !self.inner.queues.read().contains_key(&request.resource_class) {
                warn!(
                    resource_class = %request.resource_class,
                    limit = config.default_class_limit,
                    "admitting unregistered resource class"
                );
            }
        }

        let meta = TaskMetadata {
            id: TaskId::new_v4(),
            resource_class: request.resource_class,
            action: request.action,
            context: request.context,
            priority: request.priority,
            created_at_ms: now_ms(),
            seq: self.inner.seq.fetch_add(1, Ordering::Relaxed),
            retries: 0,
            max_retries: request.max_retries.unwrap_or(config.default_max_retries),
            timeout: request.timeout.unwrap_or_else(|| config.default_timeout()),
        };
        let id = meta.id;
        let resource_class = meta.resource_class.clone();
        let priority = meta.priority;
        let task = TaskRecord::new(meta, request.payload, request.callback);

        // Recorded first so the trail never shows a dispatch before its enqueue.
        self.inner
            .record_audit(id, &resource_class, AuditAction::Enqueue, None);
        self.inner.queue_for(&resource_class).lock().put(task);
        self.inner.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        debug!(task_id = %id, resource_class = %resource_class, %priority, "task enqueued");

        self.inner.wake.notify_one();
        Ok(id)
    }

    /// Cancel a queued or running task.
    ///
    /// A queued task is removed at once and gets a `Cancelled` result. A
    /// running task has its execution aborted and settles as `Cancelled`
    /// shortly after, even if its executor had already returned. Returns
    /// `false` for unknown or already finished tasks.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        let state = self.inner.state.lock();
        if let Some(running) = state.running.get(&id) {
            running.cancel.cancel();
            info!(task_id = %id, resource_class = %running.resource_class, "cancelling running task");
            return true;
        }

        let queues = self.inner.queues.read();
        let removed = queues.values().find_map(|queue| queue.lock().remove(&id));
        drop(queues);
        let Some(task) = removed else {
            debug!(task_id = %id, "cancel requested for unknown task");
            return false;
        };

        self.inner.results.lock().deliver(ResultSummary::errored(
            TaskStatus::Cancelled,
            id,
            BrokerError::Cancelled.to_string(),
            None,
            now_ms(),
        ));
        drop(state);

        self.inner.counters.cancelled.fetch_add(1, Ordering::Relaxed);
        self.inner.record_audit(
            id,
            &task.meta.resource_class,
            AuditAction::Cancel,
            Some("queued".into()),
        );
        info!(task_id = %id, resource_class = %task.meta.resource_class, "cancelled queued task");
        true
    }

    /// Current status: running registry, then results, then queues.
    ///
    /// `None` if the task is unknown or its result has been evicted.
    #[must_use]
    pub fn get_status(&self, id: TaskId) -> Option<TaskStatus> {
        let state = self.inner.state.lock();
        if state.running.contains_key(&id) {
            return Some(TaskStatus::Running);
        }
        if let Some(status) = self.inner.results.lock().peek(&id).map(|s| s.status) {
            return Some(status);
        }
        let status = self
            .inner
            .queues
            .read()
            .values()
            .find_map(|queue| queue.lock().status(&id));
        drop(state);
        status
    }

    /// When the current attempt of a running task started.
    #[must_use]
    pub fn started_at_ms(&self, id: TaskId) -> Option<u128> {
        self.inner
            .state
            .lock()
            .running
            .get(&id)
            .map(|t| t.started_at_ms)
    }

    /// Terminal result if one is stored. Does not consume it.
    #[must_use]
    pub fn try_get_result(&self, id: TaskId) -> Option<ResultSummary> {
        self.inner.results.lock().peek(&id).cloned()
    }

    /// Wait up to `wait` for a terminal result.
    ///
    /// Reading is idempotent: every caller sees the same summary until it is
    /// acknowledged or expires.
    ///
    /// # Errors
    ///
    /// Returns `BrokerError::ResultWaitTimeout` if no result appears in time.
    pub async fn get_result(&self, id: TaskId, wait: Duration) -> Result<ResultSummary, BrokerError> {
        let poll = self.inner.config.result_poll_interval();
        tokio::time::timeout(wait, async {
            loop {
                if let Some(summary) = self.try_get_result(id) {
                    return summary;
                }
                tokio::time::sleep(poll).await;
            }
        })
        .await
        .map_err(|_| BrokerError::ResultWaitTimeout(id))
    }

    /// Remove a terminal result once the caller has consumed it.
    pub fn acknowledge_result(&self, id: TaskId) -> Option<ResultSummary> {
        let summary = self.inner.results.lock().take(&id);
        if summary.is_some() {
            debug!(task_id = %id, "result acknowledged");
        }
        summary
    }

    /// Lifetime counters plus live queue depth and running counts.
    #[must_use]
    pub fn get_queue_stats(&self) -> BrokerStats {
        let config = &self.inner.config;
        let counters = &self.inner.counters;
        let state = self.inner.state.lock();

        let mut classes: BTreeMap<String, ClassStats> = self
            .inner
            .queues
            .read()
            .iter()
            .map(|(name, queue)| {
                let stats = ClassStats {
                    queued: queue.lock().size(),
                    running: state.running_in(name),
                    max_concurrent: config.class_limit(name),
                };
                (name.clone(), stats)
            })
            .collect();
        for name in config.resource_classes.keys() {
            classes.entry(name.clone()).or_insert_with(|| ClassStats {
                queued: 0,
                running: state.running_in(name),
                max_concurrent: config.class_limit(name),
            });
        }
        let running = state.running.len();
        drop(state);

        BrokerStats {
            enqueued: counters.enqueued.load(Ordering::Relaxed),
            completed: counters.completed.load(Ordering::Relaxed),
            failed: counters.failed.load(Ordering::Relaxed),
            timed_out: counters.timed_out.load(Ordering::Relaxed),
            cancelled: counters.cancelled.load(Ordering::Relaxed),
            retried: counters.retried.load(Ordering::Relaxed),
            queued: classes.values().map(|c| c.queued).sum(),
            running,
            max_concurrent: config.max_concurrent,
            classes,
        }
    }

    /// Queued tasks in dispatch order, for one class or all of them.
    ///
    /// Across classes, tasks are ordered by priority then enqueue order.
    #[must_use]
    pub fn snapshot(&self, resource_class: Option<&str>) -> Vec<QueuedTaskView> {
        let queues = self.inner.queues.read();
        match resource_class {
            Some(name) => queues
                .get(name)
                .map(|queue| queue.lock().snapshot())
                .unwrap_or_default(),
            None => {
                let mut all: Vec<QueuedTaskView> = queues
                    .values()
                    .flat_map(|queue| queue.lock().snapshot())
                    .collect();
                all.sort_by_key(|t| (t.priority.rank(), t.seq));
                all
            }
        }
    }
}
