//! Tests for audit sink

use prometheus_admission::core::{
    AdmissionAction, AdmissionError, AdmissionRecord, AuditEvent, AuditSink, InMemoryAuditSink,
};

fn admitted(id: u64) -> Result<AdmissionRecord, AdmissionError> {
    Ok(AdmissionRecord {
        id,
        participant_id: "user-1".into(),
        resource_id: "course-1".into(),
        registered_at_ms: 0,
    })
}

fn full() -> Result<AdmissionRecord, AdmissionError> {
    Err(AdmissionError::CapacityExceeded {
        resource: "course-1".into(),
        capacity: 30,
    })
}

#[test]
fn test_in_memory_audit_sink() {
    let mut sink = InMemoryAuditSink::new(10);

    sink.record(AuditEvent::from_outcome("course-1", "user-1", &admitted(7)));
    assert_eq!(sink.events().len(), 1);

    let events = sink.events();
    assert_eq!(events[0].resource, "course-1");
    assert_eq!(events[0].action, AdmissionAction::Admit);
    assert_eq!(events[0].record_id, Some(7));
    assert!(events[0].reason.is_none());
}

#[test]
fn test_audit_sink_overflow() {
    let mut sink = InMemoryAuditSink::new(2);

    sink.record(AuditEvent::from_outcome("course-1", "user-1", &admitted(1)));
    sink.record(AuditEvent::from_outcome("course-1", "user-2", &admitted(2)));
    sink.record(AuditEvent::from_outcome("course-1", "user-3", &full()));

    let events = sink.events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].participant, "user-2"); // First one popped
    assert_eq!(events[1].participant, "user-3");
    assert_eq!(sink.count(AdmissionAction::RejectCapacity), 1);
}

#[test]
fn test_zero_capacity_sink_drops_everything() {
    let mut sink = InMemoryAuditSink::new(0);
    sink.record(AuditEvent::from_outcome("course-1", "user-1", &admitted(1)));
    assert!(sink.events().is_empty());
}

#[test]
fn test_events_for_resource() {
    let mut sink = InMemoryAuditSink::new(10);
    sink.record(AuditEvent::from_outcome("course-1", "user-1", &admitted(1)));
    sink.record(AuditEvent::from_outcome("course-2", "user-1", &full()));

    let events = sink.events_for("course-2");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, AdmissionAction::RejectCapacity);
}

#[test]
fn test_action_classification() {
    let duplicate: Result<AdmissionRecord, AdmissionError> =
        Err(AdmissionError::DuplicateSubmission {
            participant: "user-1".into(),
            resource: "course-1".into(),
        });
    let missing: Result<AdmissionRecord, AdmissionError> =
        Err(AdmissionError::CourseNotFound("course-9".into()));

    assert_eq!(AdmissionAction::of(&admitted(1)), AdmissionAction::Admit);
    assert_eq!(AdmissionAction::of(&full()), AdmissionAction::RejectCapacity);
    assert_eq!(AdmissionAction::of(&duplicate), AdmissionAction::RejectDuplicate);
    assert_eq!(AdmissionAction::of(&missing), AdmissionAction::Error);
    assert!(AdmissionAction::RejectDuplicate.is_rejection());
    assert!(!AdmissionAction::Admit.is_rejection());
}

#[test]
fn test_failed_attempt_keeps_reason() {
    let missing: Result<AdmissionRecord, AdmissionError> =
        Err(AdmissionError::CourseNotFound("course-9".into()));
    let event = AuditEvent::from_outcome("course-9", "user-1", &missing);

    assert_eq!(event.participant, "user-1");
    assert_eq!(event.reason.as_deref(), Some("course not found: course-9"));
    assert!(event.created_at_ms > 0);
    assert!(!event.event_id.is_empty());
}

#[test]
fn test_action_serializes_snake_case() {
    assert_eq!(
        serde_json::to_string(&AdmissionAction::RejectDuplicate).unwrap(),
        "\"reject_duplicate\""
    );
    assert_eq!(AdmissionAction::RejectCapacity.to_string(), "reject_capacity");
}
