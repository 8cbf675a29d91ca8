//! Coordination store backends.

pub mod memory;

pub use memory::InMemoryCoordinationStore;
