//! Tests for configuration validation

use prometheus_admission::config::{AdmissionConfig, LockConfig, ServiceConfig};

#[test]
fn test_lock_config_validation() {
    assert!(LockConfig::default().validate().is_ok());
}

#[test]
fn test_lock_config_invalid_ttl() {
    let invalid = LockConfig {
        lease_ttl_ms: 0,
        ..LockConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_lock_config_invalid_retries() {
    let invalid = LockConfig {
        max_retries: 0,
        ..LockConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_lock_config_empty_prefix() {
    let invalid = LockConfig {
        channel_prefix: String::new(),
        ..LockConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_admission_config_templates() {
    let invalid = AdmissionConfig {
        marker_key_template: "marker:{resource}".into(),
        ..AdmissionConfig::default()
    };
    assert!(invalid.validate().is_err());

    let invalid = AdmissionConfig {
        duplicate_window_secs: 0,
        ..AdmissionConfig::default()
    };
    assert!(invalid.validate().is_err());
}

#[test]
fn test_service_config_from_json() {
    let json = r#"{
        "lock": {
            "lease_ttl_ms": 10000,
            "max_retries": 5,
            "retry_delay_ms": 50
        },
        "admission": {
            "duplicate_window_secs": 3
        }
    }"#;

    let config = ServiceConfig::from_json_str(json).unwrap();
    assert_eq!(config.lock.lease_ttl_ms, 10_000);
    assert_eq!(config.lock.max_retries, 5);
    assert_eq!(config.lock.lock_prefix, "lock:");
    assert_eq!(config.admission.duplicate_window_secs, 3);
    assert_eq!(config.admission.counter_key("7"), "course:7:applies");
}

#[test]
fn test_service_config_from_empty_json() {
    let config = ServiceConfig::from_json_str("{}").unwrap();
    assert_eq!(config, ServiceConfig::default());
}

#[test]
fn test_service_config_rejects_invalid_json() {
    assert!(ServiceConfig::from_json_str("not json").is_err());
    assert!(ServiceConfig::from_json_str(r#"{"lock": {"max_retries": 0}}"#).is_err());
}
