//! API-facing request/response models for the enrollment surface.
//!
//! Routing and request validation live in the HTTP layer; these functions
//! are what its handlers call.

use serde::{Deserialize, Serialize};

use crate::core::{
    AdmissionController, AdmissionError, AdmissionRecord, AdmissionRepository, CoordinationStore,
    Course, CourseCatalog, CourseFilter, LockManager,
};

/// Course application payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyRequest {
    /// Course to apply for.
    pub course_id: String,
    /// Applying user.
    pub user_id: String,
}

/// Course listing query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseQuery {
    /// Only courses starting at or after this time (ms since epoch).
    pub start_at_ms: Option<u128>,
    /// Only courses ending at or before this time (ms since epoch).
    pub end_at_ms: Option<u128>,
    /// Page size, default 10.
    pub limit: Option<usize>,
    /// Page offset, default 0.
    pub offset: Option<usize>,
}

impl From<CourseQuery> for CourseFilter {
    fn from(q: CourseQuery) -> Self {
        let defaults = Self::default();
        Self {
            start_at_ms: q.start_at_ms,
            end_at_ms: q.end_at_ms,
            limit: q.limit.unwrap_or(defaults.limit),
            offset: q.offset.unwrap_or(defaults.offset),
        }
    }
}

/// Error body returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Stable machine-readable code.
    pub code: String,
    /// HTTP status the transport should use.
    pub status: u16,
    /// Human-readable message.
    pub message: String,
    /// Whether the same request may succeed later.
    pub retryable: bool,
}

impl From<&AdmissionError> for ErrorResponse {
    fn from(err: &AdmissionError) -> Self {
        let (code, status) = match err {
            AdmissionError::CapacityExceeded { .. } => ("capacity_exceeded", 409),
            AdmissionError::DuplicateSubmission { .. } => ("duplicate_submission", 429),
            AdmissionError::LockAcquisitionExhausted { .. } => ("lock_unavailable", 503),
            AdmissionError::CourseNotFound(_) => ("course_not_found", 404),
            AdmissionError::Store(_) | AdmissionError::Record(_) => ("backend_unavailable", 503),
            AdmissionError::Config(_) => ("misconfigured", 500),
        };
        Self {
            code: code.into(),
            status,
            message: err.to_string(),
            retryable: err.is_retryable(),
        }
    }
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
}

/// Apply for a course, using the course's seat count as capacity.
pub async fn apply_for_course<S, R, L, C>(
    controller: &AdmissionController<S, R, L>,
    catalog: &C,
    req: &ApplyRequest,
) -> Result<AdmissionRecord, AdmissionError>
where
    S: CoordinationStore + ?Sized,
    R: AdmissionRepository + ?Sized,
    L: LockManager,
    C: CourseCatalog + ?Sized,
{
    let course = catalog
        .find_course(&req.course_id)
        .await
        .map_err(AdmissionError::Record)?
        .ok_or_else(|| AdmissionError::CourseNotFound(req.course_id.clone()))?;
    controller
        .admit(&course.id, &req.user_id, course.max_participants)
        .await
}

/// List a user's admissions.
pub async fn user_admissions<S, R, L>(
    controller: &AdmissionController<S, R, L>,
    user_id: &str,
) -> Result<Vec<AdmissionRecord>, AdmissionError>
where
    S: CoordinationStore + ?Sized,
    R: AdmissionRepository + ?Sized,
    L: LockManager,
{
    controller.admissions_for(user_id).await
}

/// List courses matching `query`.
pub async fn list_courses<C>(catalog: &C, query: CourseQuery) -> Result<Vec<Course>, AdmissionError>
where
    C: CourseCatalog + ?Sized,
{
    catalog
        .find_courses(&query.into())
        .await
        .map_err(AdmissionError::Record)
}

/// Return a health payload.
pub const fn health() -> Health {
    Health { ok: true }
}
