//! Tests for audit sink

use prometheus_agent_broker::core::{build_audit_event, AuditAction, AuditSink, InMemoryAuditSink};
use prometheus_agent_broker::util::TaskId;

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);
    let task = TaskId::new_v4();

    sink.record(build_audit_event(task, "scout", AuditAction::Enqueue, None));
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].task_id, task);
    assert_eq!(events[0].resource_class, "scout");
    assert_eq!(events[0].action, AuditAction::Enqueue);
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);
    let ids: Vec<TaskId> = (0..3).map(|_| TaskId::new_v4()).collect();

    for id in &ids {
        sink.record(build_audit_event(*id, "scout", AuditAction::Enqueue, None));
    }

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].task_id, ids[1]); // First one popped
    assert_eq!(events[1].task_id, ids[2]);
}

#[test]
fn test_audit_sink_clones_share_buffer() {
    let sink = InMemoryAuditSink::new(4);
    let mut writer = sink.clone();
    writer.record(build_audit_event(TaskId::new_v4(), "scout", AuditAction::Dispatch, None));
    assert_eq!(sink.events().len(), 1);
}

#[test]
fn test_zero_capacity_sink_drops_everything() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(build_audit_event(TaskId::new_v4(), "scout", AuditAction::Cancel, None));
    assert!(sink.events().is_empty());
}

#[test]
fn test_build_audit_event() {
    let task = TaskId::new_v4();
    let event = build_audit_event(
        task,
        "developer",
        AuditAction::Fail,
        Some("execution failed: boom".to_string()),
    );

    assert_eq!(event.task_id, task);
    assert_eq!(event.resource_class, "developer");
    assert_eq!(event.action, AuditAction::Fail);
    assert_eq!(event.detail.as_deref(), Some("execution failed: boom"));
    assert!(!event.event_id.is_empty());
    assert!(event.created_at_ms > 0);
    assert_eq!(event.action.to_string(), "fail");
}
