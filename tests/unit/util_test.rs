//! Tests for utility functions

use prometheus_agent_broker::util::{init_tracing, now_ms, Priority, TaskId, DEFAULT_LOG_DIRECTIVE};

#[test]
fn test_priority_ordering() {
    assert!(Priority::Critical > Priority::High);
    assert!(Priority::High > Priority::Normal);
    assert!(Priority::Normal > Priority::Low);
}

#[test]
fn test_priority_rank_serves_critical_first() {
    let mut levels = vec![Priority::Low, Priority::Critical, Priority::Normal, Priority::High];
    levels.sort_by_key(|p| p.rank());
    assert_eq!(
        levels,
        vec![Priority::Critical, Priority::High, Priority::Normal, Priority::Low]
    );
}

#[test]
fn test_priority_serde() {
    assert_eq!(serde_json::to_string(&Priority::Critical).unwrap(), "\"critical\"");
    let p: Priority = serde_json::from_str("\"low\"").unwrap();
    assert_eq!(p, Priority::Low);
    assert_eq!(Priority::default(), Priority::Normal);
}

#[test]
fn test_task_id_unique() {
    let a = TaskId::new_v4();
    let b = TaskId::new_v4();
    assert_ne!(a, b);
}

#[test]
fn test_now_ms_monotone_enough() {
    let a = now_ms();
    let b = now_ms();
    assert!(a > 0);
    assert!(b >= a);
}

#[test]
fn test_init_tracing_is_repeatable() {
    init_tracing();
    init_tracing();
    assert!(DEFAULT_LOG_DIRECTIVE.starts_with("prometheus_agent_broker"));
}
