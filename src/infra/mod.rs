//! Infrastructure adapters for the coordination store and system of record.

pub mod records;
pub mod store;

pub use records::{InMemoryAdmissionRepository, InMemoryCourseCatalog};
pub use store::InMemoryCoordinationStore;
