//! Tests for builder modules

use std::time::Duration;

use prometheus_agent_broker::builders::BrokerBuilder;
use prometheus_agent_broker::config::BrokerConfig;
use prometheus_agent_broker::core::{BrokerError, InMemoryAuditSink, TaskRequest};
use prometheus_agent_broker::util::serde::Priority;

#[test]
fn test_broker_builder_defaults() {
    let config = BrokerConfig {
        max_concurrent: 8,
        ..BrokerConfig::default()
    };

    let builder = BrokerBuilder::new("agents", config);
    assert_eq!(builder.name(), "agents");
    assert_eq!(builder.config().max_concurrent, 8);
    assert!(builder.config().resource_classes.is_empty());
}

#[test]
fn test_request_priority_default() {
    let request = TaskRequest::new("scout", "scan");
    assert_eq!(request.priority, Priority::Normal);
}

#[test]
fn test_broker_builder_timeout_rounding() {
    let builder = BrokerBuilder::new("agents", BrokerConfig::default())
        .default_timeout(Duration::from_millis(1));
    assert_eq!(builder.config().default_timeout_secs, 1);

    let builder = builder.default_timeout(Duration::MAX);
    assert_eq!(builder.config().default_timeout_secs, u64::MAX);

    let builder = builder.default_timeout(Duration::ZERO);
    assert_eq!(builder.config().default_timeout_secs, 1);
}

#[test]
fn test_broker_builder_overrides() {
    let builder = BrokerBuilder::new("agents", BrokerConfig::default())
        .max_concurrent(3)
        .resource_class("scout", 2)
        .resource_class("developer", 1)
        .strict(true)
        .default_timeout(Duration::from_millis(1500))
        .default_max_retries(0)
        .poll_interval(Duration::from_millis(10));

    let cfg = builder.config();
    assert_eq!(cfg.max_concurrent, 3);
    assert_eq!(cfg.class_limit("scout"), 2);
    assert_eq!(cfg.class_limit("developer"), 1);
    assert!(cfg.strict_resource_classes);
    assert_eq!(cfg.default_timeout_secs, 2);
    assert_eq!(cfg.default_max_retries, 0);
    assert_eq!(cfg.dispatch_interval_ms, 10);
    assert_eq!(cfg.result_poll_interval_ms, 10);
}

#[test]
fn test_broker_builder_build() {
    let broker = BrokerBuilder::new("agents", BrokerConfig::default())
        .resource_class("scout", 2)
        .audit(InMemoryAuditSink::new(16))
        .build()
        .unwrap();
    assert!(!broker.is_running());
    assert_eq!(broker.config().class_limit("scout"), 2);
}

#[test]
fn test_broker_builder_rejects_invalid() {
    let result = BrokerBuilder::new("agents", BrokerConfig::default())
        .max_concurrent(0)
        .build();
    assert!(matches!(result, Err(BrokerError::InvalidConfig(_))));
}
