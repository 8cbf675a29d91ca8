//! Error types for coordination, locking, and admission operations.

use thiserror::Error;

/// Errors produced by coordination store backends.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Backend-specific failure with context.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Errors produced by the distributed lock manager.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LockError {
    /// The lease stayed held by someone else for the whole retry budget.
    #[error("failed to acquire lock on `{resource}` after {attempts} attempts")]
    AcquisitionExhausted {
        /// Resource whose lease could not be taken.
        resource: String,
        /// Number of conditional-set attempts made.
        attempts: u32,
    },
    /// The coordination store failed underneath the lock.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors produced by the system of record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecordError {
    /// An admission for this participant and resource already exists.
    #[error("admission for participant `{participant}` on `{resource}` already exists")]
    UniqueConstraintViolation {
        /// Participant identifier.
        participant: String,
        /// Resource identifier.
        resource: String,
    },
    /// Backend-specific failure with context.
    #[error("record backend error: {0}")]
    Backend(String),
}

/// Errors surfaced by the admission controller and API layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdmissionError {
    /// The resource has no free capacity left.
    #[error("capacity exceeded for `{resource}` (capacity {capacity})")]
    CapacityExceeded {
        /// Resource identifier.
        resource: String,
        /// Capacity the request was checked against.
        capacity: u32,
    },
    /// The participant submitted again inside the suppression window, or is
    /// already admitted.
    #[error("duplicate submission by `{participant}` for `{resource}`")]
    DuplicateSubmission {
        /// Participant identifier.
        participant: String,
        /// Resource identifier.
        resource: String,
    },
    /// The resource lock could not be acquired within the retry budget.
    #[error("lock acquisition exhausted for `{resource}` after {attempts} attempts")]
    LockAcquisitionExhausted {
        /// Resource identifier.
        resource: String,
        /// Number of attempts made.
        attempts: u32,
    },
    /// The requested course does not exist.
    #[error("course not found: {0}")]
    CourseNotFound(String),
    /// Coordination store failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// System of record failure.
    #[error(transparent)]
    Record(RecordError),
    /// Invalid configuration.
    #[error("config invalid: {0}")]
    Config(String),
}

impl From<LockError> for AdmissionError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::AcquisitionExhausted { resource, attempts } => {
                Self::LockAcquisitionExhausted { resource, attempts }
            }
            LockError::Store(e) => Self::Store(e),
        }
    }
}

impl From<RecordError> for AdmissionError {
    fn from(err: RecordError) -> Self {
        match err {
            // The system of record is the authority on uniqueness.
            RecordError::UniqueConstraintViolation {
                participant,
                resource,
            } => Self::DuplicateSubmission {
                participant,
                resource,
            },
            other => Self::Record(other),
        }
    }
}

impl AdmissionError {
    /// Whether retrying the same request later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::DuplicateSubmission { .. }
                | Self::LockAcquisitionExhausted { .. }
                | Self::Store(_)
                | Self::Record(_)
        )
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
