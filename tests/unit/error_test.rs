//! Tests for error types

use prometheus_admission::core::{AdmissionError, LockError, RecordError, StoreError};

#[test]
fn test_capacity_exceeded_error() {
    let err = AdmissionError::CapacityExceeded {
        resource: "course-1".into(),
        capacity: 30,
    };
    assert_eq!(format!("{err}"), "capacity exceeded for `course-1` (capacity 30)");
    assert!(!err.is_retryable());
}

#[test]
fn test_lock_exhausted_error() {
    let err = LockError::AcquisitionExhausted {
        resource: "course-1".into(),
        attempts: 40,
    };
    assert_eq!(
        format!("{err}"),
        "failed to acquire lock on `course-1` after 40 attempts"
    );
}

#[test]
fn test_lock_error_converts_to_admission_error() {
    let err: AdmissionError = LockError::AcquisitionExhausted {
        resource: "course-1".into(),
        attempts: 3,
    }
    .into();
    assert_eq!(
        err,
        AdmissionError::LockAcquisitionExhausted {
            resource: "course-1".into(),
            attempts: 3,
        }
    );

    let err: AdmissionError = LockError::Store(StoreError::Backend("down".into())).into();
    assert_eq!(err, AdmissionError::Store(StoreError::Backend("down".into())));
}

#[test]
fn test_unique_violation_maps_to_duplicate() {
    let err: AdmissionError = RecordError::UniqueConstraintViolation {
        participant: "user-1".into(),
        resource: "course-1".into(),
    }
    .into();
    assert_eq!(
        err,
        AdmissionError::DuplicateSubmission {
            participant: "user-1".into(),
            resource: "course-1".into(),
        }
    );
    assert!(err.is_retryable());
}

#[test]
fn test_backend_error() {
    let err = StoreError::Backend("connection failed".to_string());
    assert_eq!(format!("{err}"), "backend error: connection failed");

    let err: AdmissionError = RecordError::Backend("timeout".into()).into();
    assert_eq!(format!("{err}"), "record backend error: timeout");
}
