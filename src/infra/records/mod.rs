//! System of record backends.

pub mod memory;

pub use memory::{InMemoryAdmissionRepository, InMemoryCourseCatalog};
