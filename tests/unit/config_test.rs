//! Tests for configuration validation

use prometheus_agent_broker::config::{BrokerConfig, ResourceClassConfig};

#[test]
fn test_broker_config_validation() {
    let valid = BrokerConfig::default().with_class("scout", 3);
    assert!(valid.validate().is_ok());
}

#[test]
fn test_broker_config_invalid_max_concurrent() {
    let invalid = BrokerConfig {
        max_concurrent: 0,
        ..BrokerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_broker_config_invalid_class_limit() {
    let invalid = BrokerConfig::default().with_class("developer", 0);
    let err = invalid.validate().unwrap_err();
    assert!(err.contains("developer"));
}

#[test]
fn test_broker_config_invalid_timeout() {
    let invalid = BrokerConfig {
        default_timeout_secs: 0,
        ..BrokerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_broker_config_invalid_intervals() {
    let invalid = BrokerConfig {
        dispatch_interval_ms: 0,
        ..BrokerConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_broker_config_from_json() {
    let cfg = BrokerConfig::from_json_str(
        r#"{
            "max_concurrent": 4,
            "resource_classes": {
                "scout": { "max_concurrent": 2 },
                "developer": { "max_concurrent": 1 }
            },
            "strict_resource_classes": true
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.max_concurrent, 4);
    assert!(cfg.strict_resource_classes);
    assert_eq!(
        cfg.resource_classes.get("scout"),
        Some(&ResourceClassConfig { max_concurrent: 2 })
    );
    assert_eq!(cfg.class_limit("developer"), 1);
    // Unspecified fields keep their defaults.
    assert_eq!(cfg.result_ttl_secs, 1800);
    assert_eq!(cfg.cleanup_interval_secs, 60);
}

#[test]
fn test_broker_config_from_json_rejects_invalid() {
    assert!(BrokerConfig::from_json_str("not json").is_err());
    assert!(BrokerConfig::from_json_str(r#"{"max_concurrent": 0}"#).is_err());
}

#[test]
fn test_unregistered_class_falls_back_to_default_limit() {
    let cfg = BrokerConfig {
        default_class_limit: 5,
        ..BrokerConfig::default()
    };
    assert!(!cfg.is_registered("researcher"));
    assert_eq!(cfg.class_limit("researcher"), 5);
}
