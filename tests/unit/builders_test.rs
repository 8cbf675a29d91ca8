//! Tests for builder modules

use std::sync::Arc;

use prometheus_admission::builders::{build_controller, build_in_memory};
use prometheus_admission::config::{LockConfig, ServiceConfig};
use prometheus_admission::core::AdmissionError;
use prometheus_admission::infra::{InMemoryAdmissionRepository, InMemoryCoordinationStore};

#[test]
fn test_build_controller_shares_config() {
    let mut cfg = ServiceConfig::default();
    cfg.lock.max_retries = 7;

    let controller = build_controller(
        &cfg,
        Arc::new(InMemoryCoordinationStore::new()),
        Arc::new(InMemoryAdmissionRepository::new()),
    )
    .unwrap();
    assert_eq!(controller.locks().config().max_retries, 7);
    assert_eq!(controller.config().duplicate_window_secs, 10);
}

#[test]
fn test_build_rejects_invalid_config() {
    let cfg = ServiceConfig {
        lock: LockConfig {
            lease_ttl_ms: 0,
            ..LockConfig::default()
        },
        ..ServiceConfig::default()
    };
    let err = build_in_memory(&cfg).err().unwrap();
    assert!(matches!(err, AdmissionError::Config(msg) if msg.contains("lease_ttl_ms")));
}

#[tokio::test]
async fn test_in_memory_stack_admits() {
    let (controller, store, records) = build_in_memory(&ServiceConfig::default()).unwrap();
    let record = controller.admit("course-1", "user-1", 1).await.unwrap();
    assert_eq!(record.resource_id, "course-1");
    assert_eq!(records.records().len(), 1);
    assert_eq!(store.subscriber_count("channel:course-1"), 0);
}
