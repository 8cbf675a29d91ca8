//! System of record contracts: durable admissions and the course catalog.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::RecordError;

/// Default seat count for a course that does not specify one.
pub const DEFAULT_MAX_PARTICIPANTS: u32 = 30;

/// Durable proof that a participant holds one seat of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionRecord {
    /// Record identifier assigned by the system of record.
    pub id: u64,
    /// Admitted participant.
    pub participant_id: String,
    /// Resource the participant was admitted to.
    pub resource_id: String,
    /// Registration time in milliseconds since epoch.
    pub registered_at_ms: u128,
}

/// A course whose seats are the contended resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Course identifier, used as the lock resource identifier.
    pub id: String,
    /// Title.
    pub title: String,
    /// Free-form description.
    pub description: String,
    /// Seat capacity.
    #[serde(default = "default_max_participants")]
    pub max_participants: u32,
    /// Start time in milliseconds since epoch.
    pub start_at_ms: u128,
    /// End time in milliseconds since epoch.
    pub end_at_ms: u128,
}

const fn default_max_participants() -> u32 {
    DEFAULT_MAX_PARTICIPANTS
}

/// Filter for course listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseFilter {
    /// Only courses starting at or after this time.
    pub start_at_ms: Option<u128>,
    /// Only courses ending at or before this time.
    pub end_at_ms: Option<u128>,
    /// Page size.
    pub limit: usize,
    /// Page offset.
    pub offset: usize,
}

impl Default for CourseFilter {
    fn default() -> Self {
        Self {
            start_at_ms: None,
            end_at_ms: None,
            limit: 10,
            offset: 0,
        }
    }
}

impl CourseFilter {
    /// Whether `course` falls inside the time bounds of this filter.
    #[must_use]
    pub fn matches(&self, course: &Course) -> bool {
        self.start_at_ms.is_none_or(|s| course.start_at_ms >= s)
            && self.end_at_ms.is_none_or(|e| course.end_at_ms <= e)
    }
}

/// Persistent store of admitted participants per resource.
#[async_trait]
pub trait AdmissionRepository: Send + Sync + 'static {
    /// Authoritative number of admissions for `resource_id`.
    async fn count_admissions(&self, resource_id: &str) -> Result<u64, RecordError>;

    /// Durably create an admission.
    ///
    /// Fails with [`RecordError::UniqueConstraintViolation`] when the
    /// (participant, resource) pair already exists.
    async fn create_admission(
        &self,
        participant_id: &str,
        resource_id: &str,
    ) -> Result<AdmissionRecord, RecordError>;

    /// All admissions held by `participant_id`, oldest first.
    async fn find_admissions_by_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<AdmissionRecord>, RecordError>;
}

/// Read access to the course catalog.
#[async_trait]
pub trait CourseCatalog: Send + Sync + 'static {
    /// Look up a single course.
    async fn find_course(&self, course_id: &str) -> Result<Option<Course>, RecordError>;

    /// List courses matching `filter`, ordered by start time.
    async fn find_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, RecordError>;
}
