//! In-memory admission repository and course catalog.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{
    AdmissionRecord, AdmissionRepository, Course, CourseCatalog, CourseFilter, RecordError,
};
use crate::util::clock::now_ms;

#[derive(Debug, Default)]
struct Admissions {
    next_id: u64,
    records: Vec<AdmissionRecord>,
    /// (participant, resource) pairs, the uniqueness constraint.
    pairs: HashSet<(String, String)>,
    per_resource: HashMap<String, u64>,
}

/// Admission table kept in process memory, with a unique (participant, resource) constraint.
#[derive(Debug, Default)]
pub struct InMemoryAdmissionRepository {
    inner: Mutex<Admissions>,
}

impl InMemoryAdmissionRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored record.
    #[must_use]
    pub fn records(&self) -> Vec<AdmissionRecord> {
        self.inner.lock().records.clone()
    }
}

#[async_trait]
impl AdmissionRepository for InMemoryAdmissionRepository {
    async fn count_admissions(&self, resource_id: &str) -> Result<u64, RecordError> {
        Ok(self
            .inner
            .lock()
            .per_resource
            .get(resource_id)
            .copied()
            .unwrap_or(0))
    }

    async fn create_admission(
        &self,
        participant_id: &str,
        resource_id: &str,
    ) -> Result<AdmissionRecord, RecordError> {
        let mut inner = self.inner.lock();
        let pair = (participant_id.to_string(), resource_id.to_string());
        if inner.pairs.contains(&pair) {
            return Err(RecordError::UniqueConstraintViolation {
                participant: pair.0,
                resource: pair.1,
            });
        }
        inner.next_id += 1;
        let record = AdmissionRecord {
            id: inner.next_id,
            participant_id: pair.0.clone(),
            resource_id: pair.1.clone(),
            registered_at_ms: now_ms(),
        };
        *inner.per_resource.entry(pair.1.clone()).or_insert(0) += 1;
        inner.pairs.insert(pair);
        inner.records.push(record.clone());
        Ok(record)
    }

    async fn find_admissions_by_participant(
        &self,
        participant_id: &str,
    ) -> Result<Vec<AdmissionRecord>, RecordError> {
        Ok(self
            .inner
            .lock()
            .records
            .iter()
            .filter(|r| r.participant_id == participant_id)
            .cloned()
            .collect())
    }
}

/// Course catalog kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryCourseCatalog {
    courses: Mutex<HashMap<String, Course>>,
}

impl InMemoryCourseCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a course.
    pub fn upsert(&self, course: Course) {
        self.courses.lock().insert(course.id.clone(), course);
    }
}

#[async_trait]
impl CourseCatalog for InMemoryCourseCatalog {
    async fn find_course(&self, course_id: &str) -> Result<Option<Course>, RecordError> {
        Ok(self.courses.lock().get(course_id).cloned())
    }

    async fn find_courses(&self, filter: &CourseFilter) -> Result<Vec<Course>, RecordError> {
        let mut matching: Vec<Course> = self
            .courses
            .lock()
            .values()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.start_at_ms.cmp(&b.start_at_ms).then_with(|| a.id.cmp(&b.id)));
        Ok(matching
            .into_iter()
            .skip(filter.offset)
            .take(filter.limit)
            .collect())
    }
}
