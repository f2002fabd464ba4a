//! Tests for the result store

use std::time::Duration;

use prometheus_agent_broker::core::TaskStatus;
use prometheus_agent_broker::infra::{InMemoryResultStore, ResultSummary};
use prometheus_agent_broker::util::TaskId;
use serde_json::json;

#[test]
fn test_peek_is_idempotent_take_evicts() {
    let mut store = InMemoryResultStore::new();
    let id = TaskId::new_v4();
    store.deliver(ResultSummary::completed(id, json!(42), Duration::from_millis(5), 995, 1_000));

    assert_eq!(store.peek(&id).map(|s| s.status), Some(TaskStatus::Completed));
    assert_eq!(store.peek(&id).map(|s| s.status), Some(TaskStatus::Completed));
    assert_eq!(store.take(&id).and_then(|s| s.result), Some(json!(42)));
    assert!(store.peek(&id).is_none());
    assert!(store.is_empty());
}

#[test]
fn test_evict_expired_uses_created_at() {
    let mut store = InMemoryResultStore::new();
    let old = TaskId::new_v4();
    let fresh = TaskId::new_v4();
    store.deliver(ResultSummary::errored(TaskStatus::Failed, old, "boom", Some(990), 1_000));
    store.deliver(ResultSummary::errored(TaskStatus::Cancelled, fresh, "task cancelled", None, 9_500));

    let evicted = store.evict_expired(10_000, Duration::from_secs(5));
    assert_eq!(evicted, 1);
    assert!(store.peek(&old).is_none());
    assert!(store.peek(&fresh).is_some());
    assert_eq!(store.len(), 1);
}

#[test]
fn test_summary_serialization_skips_empty_fields() {
    let id = TaskId::new_v4();
    let summary = ResultSummary::errored(TaskStatus::Timeout, id, "execution timed out after 1s", None, 7);
    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["status"], json!("timeout"));
    assert_eq!(value["error"], json!("execution timed out after 1s"));
    assert!(value.get("result").is_none());
    assert!(value.get("execution_time").is_none());
}
