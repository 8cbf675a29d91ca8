//! # Prometheus Admission
//!
//! Fair distributed locking and capacity-limited admission control.
//!
//! Many processes contend for a scarce resource such as the seats of a
//! course. This crate gives them the guarantees of a centralized semaphore
//! while coordinating only through a shared key-value/pub-sub store and a
//! durable system of record.
//!
//! ## Building Blocks
//!
//! - **FIFO lock** ([`core::FifoLockManager`]): a per-resource wait queue
//!   gives fairness, a lease key with a TTL gives mutual exclusion, and a
//!   notification channel wakes waiters after every release.
//! - **Admission control** ([`core::AdmissionController`]): a cheap,
//!   advisory fast path (applied counter, duplicate marker) followed by an
//!   authoritative recount and commit under the lock.
//! - **Backends**: the [`core::CoordinationStore`],
//!   [`core::AdmissionRepository`] and [`core::CourseCatalog`] traits, with
//!   in-memory implementations under [`infra`].
//!
//! ## Admitting a Participant
//!
//! ```rust,ignore
//! use prometheus_admission::builders::build_in_memory;
//! use prometheus_admission::config::ServiceConfig;
//!
//! let (controller, _store, _records) = build_in_memory(&ServiceConfig::default())?;
//!
//! let record = controller.admit("course-42", "user-7", 30).await?;
//! assert_eq!(record.participant_id, "user-7");
//! ```
//!
//! ## Running Under the Lock
//!
//! ```rust,ignore
//! use prometheus_admission::core::{LockError, LockManager};
//!
//! let total = controller
//!     .locks()
//!     .run_exclusive("course-42", || async { Ok::<_, LockError>(1 + 1) })
//!     .await?;
//! ```
//!
//! For complete scenarios, see:
//! - `tests/lock_manager_test.rs` - mutual exclusion, FIFO order, cleanup
//! - `tests/admission_test.rs` - capacity and duplicate guarantees

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core coordination abstractions, the FIFO lock, and admission control.
pub mod core;
/// Configuration models for locking and admission.
pub mod config;
/// Builders to construct the admission stack from configuration.
pub mod builders;
/// Infrastructure adapters for coordination stores and systems of record.
pub mod infra;
/// API surface consumed by the HTTP layer.
pub mod runtime;
/// Shared utilities.
pub mod util;
