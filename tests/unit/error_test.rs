//! Tests for error types

use std::time::Duration;

use prometheus_agent_broker::core::BrokerError;
use prometheus_agent_broker::util::TaskId;

#[test]
fn test_execution_timeout_error() {
    let err = BrokerError::ExecutionTimeout(Duration::from_secs(1));
    assert_eq!(format!("{}", err), "execution timed out after 1s");
}

#[test]
fn test_execution_failure_error() {
    let err = BrokerError::ExecutionFailure("boom".to_string());
    assert_eq!(format!("{}", err), "execution failed: boom");
}

#[test]
fn test_cancelled_error() {
    assert_eq!(format!("{}", BrokerError::Cancelled), "task cancelled");
}

#[test]
fn test_result_wait_timeout_names_task() {
    let id = TaskId::new_v4();
    let err = BrokerError::ResultWaitTimeout(id);
    assert!(err.to_string().contains(&id.to_string()));
}

#[test]
fn test_operational_errors() {
    assert_eq!(BrokerError::NotRunning.to_string(), "broker is not running");
    assert_eq!(BrokerError::AlreadyRunning.to_string(), "broker is already running");
    assert_eq!(
        BrokerError::UnknownResourceClass("ghost".into()).to_string(),
        "unknown resource class: ghost"
    );
    assert_eq!(
        BrokerError::InvalidConfig("bad".into()).to_string(),
        "invalid configuration: bad"
    );
}
