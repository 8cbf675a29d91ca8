//! Tests for the API surface

use prometheus_admission::builders::build_in_memory;
use prometheus_admission::config::ServiceConfig;
use prometheus_admission::core::{AdmissionError, Course, StoreError};
use prometheus_admission::infra::InMemoryCourseCatalog;
use prometheus_admission::runtime::{
    apply_for_course, health, list_courses, user_admissions, ApplyRequest, CourseQuery,
    ErrorResponse,
};

fn course(id: &str, seats: u32, start_at_ms: u128) -> Course {
    Course {
        id: id.into(),
        title: format!("Course {id}"),
        description: "intro".into(),
        max_participants: seats,
        start_at_ms,
        end_at_ms: start_at_ms + 1_000,
    }
}

fn request(course_id: &str, user_id: &str) -> ApplyRequest {
    ApplyRequest {
        course_id: course_id.into(),
        user_id: user_id.into(),
    }
}

#[tokio::test]
async fn test_apply_uses_course_capacity() {
    let (controller, _store, _records) = build_in_memory(&ServiceConfig::default()).unwrap();
    let catalog = InMemoryCourseCatalog::new();
    catalog.upsert(course("c1", 1, 0));

    let record = apply_for_course(&controller, &catalog, &request("c1", "u1"))
        .await
        .unwrap();
    assert_eq!(record.participant_id, "u1");

    let err = apply_for_course(&controller, &catalog, &request("c1", "u2"))
        .await
        .unwrap_err();
    assert!(matches!(err, AdmissionError::CapacityExceeded { capacity: 1, .. }));

    let mine = user_admissions(&controller, "u1").await.unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn test_apply_to_unknown_course() {
    let (controller, _store, _records) = build_in_memory(&ServiceConfig::default()).unwrap();
    let catalog = InMemoryCourseCatalog::new();

    let err = apply_for_course(&controller, &catalog, &request("nope", "u1"))
        .await
        .unwrap_err();
    assert_eq!(err, AdmissionError::CourseNotFound("nope".into()));
}

#[tokio::test]
async fn test_list_courses_defaults() {
    let catalog = InMemoryCourseCatalog::new();
    for i in 0..12u128 {
        catalog.upsert(course(&format!("c{i:02}"), 30, i * 10));
    }

    let first_page = list_courses(&catalog, CourseQuery::default()).await.unwrap();
    assert_eq!(first_page.len(), 10);
    assert_eq!(first_page[0].id, "c00");

    let second_page = list_courses(
        &catalog,
        CourseQuery {
            offset: Some(10),
            ..CourseQuery::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(second_page.len(), 2);
}

#[test]
fn test_apply_request_json_shape() {
    let req: ApplyRequest =
        serde_json::from_str(r#"{"courseId": "c1", "userId": "u1"}"#).unwrap();
    assert_eq!(req, request("c1", "u1"));
}

#[test]
fn test_course_seats_default() {
    let c: Course = serde_json::from_str(
        r#"{"id": "c1", "title": "t", "description": "d", "start_at_ms": 0, "end_at_ms": 1}"#,
    )
    .unwrap();
    assert_eq!(c.max_participants, 30);
}

#[test]
fn test_error_response_mapping() {
    let full = ErrorResponse::from(&AdmissionError::CapacityExceeded {
        resource: "c1".into(),
        capacity: 30,
    });
    assert_eq!(full.code, "capacity_exceeded");
    assert_eq!(full.status, 409);
    assert!(!full.retryable);

    let dup = ErrorResponse::from(&AdmissionError::DuplicateSubmission {
        participant: "u1".into(),
        resource: "c1".into(),
    });
    assert_eq!(dup.status, 429);
    assert!(dup.retryable);

    let down = ErrorResponse::from(&AdmissionError::Store(StoreError::Backend("x".into())));
    assert_eq!(down.code, "backend_unavailable");
    assert_eq!(down.status, 503);
}

#[test]
fn test_health() {
    assert!(health().ok);
}
