//! In-memory coordination store with Redis-like semantics.
//!
//! Every primitive runs under one `parking_lot::Mutex`, so each call is
//! atomic with respect to every other call, matching a single-threaded
//! Redis server. Expiry uses `tokio::time::Instant`, so leases and markers
//! follow paused/advanced time in tests.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::core::{CoordinationStore, StoreError, Subscription};

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

#[derive(Debug, Default)]
struct State {
    values: HashMap<String, Entry>,
    lists: HashMap<String, VecDeque<String>>,
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<String>>>,
}

impl State {
    /// Live value at `key`, purging it if expired.
    fn live(&mut self, key: &str, now: Instant) -> Option<&mut Entry> {
        if self.values.get(key).is_some_and(|e| !e.is_live(now)) {
            self.values.remove(key);
        }
        self.values.get_mut(key)
    }

    /// Drop every expired value, returning how many were removed.
    fn prune_expired(&mut self, now: Instant) -> usize {
        let before = self.values.len();
        self.values.retain(|_, e| e.is_live(now));
        before.saturating_sub(self.values.len())
    }
}

/// Process-local coordination store for development and testing.
#[derive(Debug, Default)]
pub struct InMemoryCoordinationStore {
    state: Mutex<State>,
}

impl InMemoryCoordinationStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions on `channel`.
    #[must_use]
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.state
            .lock()
            .subscribers
            .get(channel)
            .map_or(0, |subs| subs.iter().filter(|tx| !tx.is_closed()).count())
    }

    /// Remove expired values now, returning how many were dropped.
    ///
    /// Writes prune as they go; this is for callers that want to reclaim
    /// memory without writing.
    pub fn prune_expired(&self) -> usize {
        self.state.lock().prune_expired(Instant::now())
    }

    /// Number of stored values, including expired ones not yet pruned.
    #[must_use]
    pub fn value_count(&self) -> usize {
        self.state.lock().values.len()
    }
}

/// Resolve Redis-style inclusive, possibly negative indices against `len`.
fn resolve_range(len: usize, start: isize, end: isize) -> Option<(usize, usize)> {
    let len = isize::try_from(len).ok()?;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };
    if len == 0 || start > end || start >= len || end < 0 {
        return None;
    }
    Some((usize::try_from(start).ok()?, usize::try_from(end).ok()?))
}

#[async_trait]
impl CoordinationStore for InMemoryCoordinationStore {
    async fn append(&self, key: &str, value: &str) -> Result<usize, StoreError> {
        let mut state = self.state.lock();
        let list = state.lists.entry(key.to_string()).or_default();
        list.push_back(value.to_string());
        Ok(list.len())
    }

    async fn range(&self, key: &str, start: isize, end: isize) -> Result<Vec<String>, StoreError> {
        let state = self.state.lock();
        let Some(list) = state.lists.get(key) else {
            return Ok(Vec::new());
        };
        Ok(resolve_range(list.len(), start, end)
            .map(|(s, e)| list.range(s..=e).cloned().collect())
            .unwrap_or_default())
    }

    async fn remove_one(&self, key: &str, value: &str) -> Result<usize, StoreError> {
        let mut state = self.state.lock();
        let Some(list) = state.lists.get_mut(key) else {
            return Ok(0);
        };
        let position = list.iter().position(|v| v == value);
        let removed = position.and_then(|idx| list.remove(idx)).map_or(0, |_| 1);
        if list.is_empty() {
            state.lists.remove(key);
        }
        Ok(removed)
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.prune_expired(now);
        if state.live(key, now).is_some() {
            return Ok(false);
        }
        state.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(true)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.prune_expired(now);
        state.values.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: ttl.map(|t| now + t),
            },
        );
        Ok(())
    }

    async fn extend_if_equal(
        &self,
        key: &str,
        expected: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        match self.state.lock().live(key, now) {
            Some(entry) if entry.value == expected => {
                entry.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        Ok(self.state.lock().live(key, now).map(|e| e.value.clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        let existed = state.live(key, now).is_some();
        state.values.remove(key);
        Ok(existed)
    }

    async fn increment(&self, key: &str) -> Result<i64, StoreError> {
        let now = Instant::now();
        let mut state = self.state.lock();
        if let Some(entry) = state.live(key, now) {
            let current: i64 = entry.value.parse().map_err(|_| {
                StoreError::Backend(format!("value at `{key}` is not an integer"))
            })?;
            let next = current
                .checked_add(1)
                .ok_or_else(|| StoreError::Backend(format!("increment overflow at `{key}`")))?;
            entry.value = next.to_string();
            return Ok(next);
        }
        state.values.insert(
            key.to_string(),
            Entry {
                value: "1".into(),
                expires_at: None,
            },
        );
        Ok(1)
    }

    async fn publish(&self, channel: &str, message: &str) -> Result<usize, StoreError> {
        let mut state = self.state.lock();
        let Some(subs) = state.subscribers.get_mut(channel) else {
            return Ok(0);
        };
        subs.retain(|tx| tx.send(message.to_string()).is_ok());
        let delivered = subs.len();
        if subs.is_empty() {
            state.subscribers.remove(channel);
        }
        Ok(delivered)
    }

    async fn subscribe(&self, channel: &str) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.state
            .lock()
            .subscribers
            .entry(channel.to_string())
            .or_default()
            .push(tx);
        Ok(Subscription::new(channel.to_string(), rx))
    }
}
