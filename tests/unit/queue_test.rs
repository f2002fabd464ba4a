//! Tests for the per-class resource queue

use std::time::Duration;

use prometheus_agent_broker::core::{TaskMetadata, TaskRecord, TaskStatus};
use prometheus_agent_broker::infra::ResourceQueue;
use prometheus_agent_broker::util::{Priority, TaskId};
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;

fn record(priority: Priority, created_at_ms: u128, seq: u64) -> TaskRecord {
    let meta = TaskMetadata {
        id: TaskId::new_v4(),
        resource_class: "scout".into(),
        action: "scan".into(),
        context: Value::Null,
        priority,
        created_at_ms,
        seq,
        retries: 0,
        max_retries: 0,
        timeout: Duration::from_secs(1),
    };
    TaskRecord::new(meta, Value::Null, None)
}

#[test]
fn test_shuffled_inserts_drain_in_key_order() {
    let levels = [Priority::Low, Priority::Normal, Priority::High, Priority::Critical];
    let mut records: Vec<TaskRecord> = (0..64u64)
        .map(|i| record(levels[(i % 4) as usize], 1_000 + u128::from(i / 4), i))
        .collect();
    records.shuffle(&mut rand::rng());

    let mut queue = ResourceQueue::new("scout");
    for r in records {
        queue.put(r);
    }
    assert_eq!(queue.size(), 64);

    let mut drained = Vec::new();
    while let Some(task) = queue.get() {
        drained.push(task.order_key());
    }
    assert_eq!(drained.len(), 64);
    assert!(drained.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(drained[0].rank, Priority::Critical.rank());
}

#[test]
fn test_random_cancellations_leave_ordered_survivors() {
    let mut rng = rand::rng();
    let levels = [Priority::Low, Priority::Normal, Priority::High, Priority::Critical];
    let mut queue = ResourceQueue::new("scout");
    let mut ids = Vec::new();
    for i in 0..100u64 {
        let r = record(levels[rng.random_range(0..levels.len())], u128::from(i), i);
        ids.push(r.id());
        queue.put(r);
    }

    ids.shuffle(&mut rng);
    let (cancelled, kept) = ids.split_at(40);
    for id in cancelled {
        assert_eq!(queue.remove(id).map(|t| t.status), Some(TaskStatus::Cancelled));
    }
    assert_eq!(queue.size(), 60);
    assert_eq!(queue.heap_len(), 100);
    assert!(kept.iter().all(|id| queue.status(id) == Some(TaskStatus::Queued)));

    let snapshot = queue.snapshot();
    let mut drained = Vec::new();
    while let Some(task) = queue.get() {
        assert!(!cancelled.contains(&task.id()));
        drained.push(task.id());
    }
    assert_eq!(drained.len(), 60);
    assert_eq!(drained, snapshot.iter().map(|v| v.id).collect::<Vec<_>>());
    assert_eq!(queue.heap_len(), 0);
}
