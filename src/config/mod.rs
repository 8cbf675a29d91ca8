//! Configuration models for the lock manager and admission controller.

pub mod service;

pub use service::{AdmissionConfig, LockConfig, ServiceConfig};
