//! Builders to construct the admission stack from configuration.

pub mod service_builder;

pub use service_builder::{build_controller, build_in_memory, InMemoryAdmissionController};
