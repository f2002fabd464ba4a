//! In-memory per-resource-class queue with priority ordering and lazy deletion.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use serde::{Deserialize, Serialize};

use crate::core::{OrderKey, TaskRecord, TaskStatus};
use crate::util::serde::{Priority, TaskId};

/// Heap slot: the ordering key plus the id it points at.
///
/// Ordered so that the smallest key sits on top of the max-heap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeapEntry {
    key: OrderKey,
    id: TaskId,
}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap pops the greatest element.
        other
            .key
            .cmp(&self.key)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Read-only view of a queued task for inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedTaskView {
    /// Task identifier.
    pub id: TaskId,
    /// Resource class of the queue holding the task.
    pub resource_class: String,
    /// Action name.
    pub action: String,
    /// Priority.
    pub priority: Priority,
    /// Creation timestamp in milliseconds since epoch.
    pub created_at_ms: u128,
    /// Broker-wide enqueue sequence; orders tasks of equal priority.
    pub seq: u64,
    /// Retries already consumed.
    pub retries: u32,
}

impl From<&TaskRecord> for QueuedTaskView {
    fn from(record: &TaskRecord) -> Self {
        Self {
            id: record.meta.id,
            resource_class: record.meta.resource_class.clone(),
            action: record.meta.action.clone(),
            priority: record.meta.priority,
            created_at_ms: record.meta.created_at_ms,
            seq: record.meta.seq,
            retries: record.meta.retries,
        }
    }
}

/// Priority queue of task records for one resource class.
///
/// Records live in `lookup`; the heap only carries keys. Removing a record
/// from `lookup` is the cancellation: its heap slot goes stale and is skipped
/// when it reaches the top. `lookup.len()` is therefore the live count and
/// never the heap length.
pub struct ResourceQueue {
    resource_class: String,
    heap: BinaryHeap<HeapEntry>,
    lookup: HashMap<TaskId, TaskRecord>,
}

impl ResourceQueue {
    /// Create an empty queue for `resource_class`.
    pub fn new(resource_class: impl Into<String>) -> Self {
        Self {
            resource_class: resource_class.into(),
            heap: BinaryHeap::new(),
            lookup: HashMap::new(),
        }
    }

    /// Resource class served by this queue.
    #[must_use]
    pub fn resource_class(&self) -> &str {
        &self.resource_class
    }

    /// Insert a record by its ordering key. O(log n).
    ///
    /// The record is stored as `Queued`; a retried record keeps its key and
    /// so its place in line.
    pub fn put(&mut self, mut task: TaskRecord) {
        task.status = TaskStatus::Queued;
        let entry = HeapEntry {
            key: task.order_key(),
            id: task.id(),
        };
        self.heap.push(entry);
        self.lookup.insert(entry.id, task);
    }

    /// Pop the live record with the smallest key, discarding stale slots.
    pub fn get(&mut self) -> Option<TaskRecord> {
        while let Some(entry) = self.heap.pop() {
            if let Some(task) = self.take_live(entry) {
                return Some(task);
            }
        }
        None
    }

    /// Key of the live head without removing it.
    ///
    /// Stale slots found on top are dropped on the way, which does not
    /// change the observable queue contents.
    pub fn peek_key(&mut self) -> Option<OrderKey> {
        while let Some(entry) = self.heap.peek().copied() {
            if self.is_live(entry) {
                return Some(entry.key);
            }
            self.heap.pop();
        }
        None
    }

    /// Cancel a queued record. O(1); the heap slot is filtered lazily.
    ///
    /// Returns the record, marked `Cancelled`, if the id was queued here.
    pub fn remove(&mut self, id: &TaskId) -> Option<TaskRecord> {
        let mut task = self.lookup.remove(id)?;
        task.status = TaskStatus::Cancelled;
        Some(task)
    }

    /// Whether `id` is queued here.
    #[must_use]
    pub fn contains(&self, id: &TaskId) -> bool {
        self.lookup.contains_key(id)
    }

    /// Status of a queued record, if present.
    #[must_use]
    pub fn status(&self, id: &TaskId) -> Option<TaskStatus> {
        self.lookup.get(id).map(|t| t.status)
    }

    /// Number of live (queued) records.
    #[must_use]
    pub fn size(&self) -> usize {
        self.lookup.len()
    }

    /// Whether no live records remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }

    /// Raw heap length, including stale slots.
    #[must_use]
    pub fn heap_len(&self) -> usize {
        self.heap.len()
    }

    /// Live records in dispatch order. Does not mutate the queue.
    #[must_use]
    pub fn snapshot(&self) -> Vec<QueuedTaskView> {
        let mut tasks: Vec<&TaskRecord> = self.lookup.values().collect();
        tasks.sort_by_key(|t| t.order_key());
        tasks.into_iter().map(QueuedTaskView::from).collect()
    }

    fn is_live(&self, entry: HeapEntry) -> bool {
        self.lookup
            .get(&entry.id)
            .is_some_and(|t| t.order_key() == entry.key)
    }

    fn take_live(&mut self, entry: HeapEntry) -> Option<TaskRecord> {
        if self.is_live(entry) {
            self.lookup.remove(&entry.id)
        } else {
            None
        }
    }
}
