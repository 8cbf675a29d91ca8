//! Core coordination abstractions: store contract, FIFO lock, admission control.

pub mod admission;
pub mod audit;
pub mod error;
pub mod lock;
pub mod record;
pub mod store;

pub use admission::AdmissionController;
pub use audit::{AdmissionAction, AuditEvent, AuditSink, InMemoryAuditSink};
pub use error::{AdmissionError, AppResult, LockError, RecordError, StoreError};
pub use lock::{
    Backoff, FifoLockManager, FixedBackoff, LockManager, ResourceKeys, RELEASE_MESSAGE,
};
pub use record::{
    AdmissionRecord, AdmissionRepository, Course, CourseCatalog, CourseFilter,
    DEFAULT_MAX_PARTICIPANTS,
};
pub use store::{CoordinationStore, Subscription};
