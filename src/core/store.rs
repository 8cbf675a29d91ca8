//! Coordination store contract.
//!
//! The lock manager and admission controller are written strictly against
//! this trait. A Redis-style backend maps each method onto one primitive
//! (`RPUSH`, `LRANGE`, `LREM key 1`, `SET NX PX`, `GET`, `SET`, `DEL`,
//! `INCR`, `PUBLISH`, `SUBSCRIBE`); the in-memory backend under
//! [`crate::infra::store`] emulates the same semantics in-process.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::StoreError;

/// Atomic key-value, list, and pub/sub primitives shared by all processes.
#[async_trait]
pub trait CoordinationStore: Send + Sync + 'static {
    /// Append `value` to the tail of the list at `key`, returning the new length.
    async fn append(&self, key: &str, value: &str) -> Result<usize, StoreError>;

    /// Read the inclusive slice `start..=end` of the list at `key`.
    ///
    /// Negative indices count from the tail (`-1` is the last element).
    async fn range(&self, key: &str, start: isize, end: isize) -> Result<Vec<String>, StoreError>;

    /// Remove the first occurrence of `value` from the list, returning how many were removed.
    async fn remove_one(&self, key: &str, value: &str) -> Result<usize, StoreError>;

    /// Set `key` to `value` with a lifetime only if no live value exists.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
        -> Result<bool, StoreError>;

    /// Reset the lifetime of `key` to `ttl` only if its live value equals `expected`.
    ///
    /// Returns whether the lifetime was extended. A Redis backend runs this as
    /// one script (`GET` compare, then `PEXPIRE`).
    async fn extend_if_equal(
        &self,
        key: &str,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError>;

    /// Unconditionally set `key`, optionally with a lifetime.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Read the live value at `key`.
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Delete `key`, returning whether a live value was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Atomically increment the integer at `key` (missing counts as zero).
    async fn increment(&self, key: &str) -> Result<i64, StoreError>;

    /// Broadcast `message` on `channel`, returning the number of receivers.
    async fn publish(&self, channel: &str, message: &str) -> Result<usize, StoreError>;

    /// Subscribe to `channel`. Only messages published after this call are seen.
    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError>;
}

/// Live subscription to one channel. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    channel: String,
    rx: mpsc::UnboundedReceiver<String>,
}

impl Subscription {
    /// Wrap a receiver fed by a backend's subscriber connection.
    #[must_use]
    pub const fn new(channel: String, rx: mpsc::UnboundedReceiver<String>) -> Self {
        Self { channel, rx }
    }

    /// Channel this subscription listens on.
    #[must_use]
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next message. `None` means the backend closed the subscription.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}
