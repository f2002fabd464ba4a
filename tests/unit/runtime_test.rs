//! Tests for API request/response models

use std::time::Duration;

use prometheus_agent_broker::core::{Broker, TaskRequest};
use prometheus_agent_broker::config::BrokerConfig;
use prometheus_agent_broker::runtime::{health, task_status, TaskSubmission};
use prometheus_agent_broker::util::{Priority, TaskId};
use serde_json::json;

#[test]
fn test_submission_deserializes_with_defaults() {
    let req: TaskSubmission =
        serde_json::from_value(json!({"agent_type": "scout", "action": "scan"})).unwrap();
    assert_eq!(req.resource_class, "scout");
    assert_eq!(req.priority, Priority::Normal);
    assert!(req.timeout_secs.is_none());
    assert!(req.max_retries.is_none());
}

#[test]
fn test_submission_into_request() {
    let req: TaskSubmission = serde_json::from_value(json!({
        "resource_class": "developer",
        "action": "implement",
        "payload": {"file": "lib.rs"},
        "priority": "high",
        "timeout_secs": 30,
        "max_retries": 1
    }))
    .unwrap();

    let request: TaskRequest = req.into();
    assert_eq!(request.resource_class, "developer");
    assert_eq!(request.action, "implement");
    assert_eq!(request.payload, json!({"file": "lib.rs"}));
    assert_eq!(request.priority, Priority::High);
    assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    assert_eq!(request.max_retries, Some(1));
}

#[test]
fn test_status_and_health_on_stopped_broker() {
    let broker = Broker::new(BrokerConfig::default()).unwrap();
    let id = TaskId::new_v4();

    let status = task_status(&broker, id);
    assert_eq!(status.task_id, id);
    assert!(status.status.is_none());
    assert!(status.result.is_none());

    let h = health(&broker);
    assert!(!h.ok);
    assert_eq!(h.queued, 0);
    assert_eq!(h.running, 0);
}
