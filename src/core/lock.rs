//! Fair distributed mutual exclusion over a [`CoordinationStore`].
//!
//! Each resource owns three keys in the store: a wait queue (fairness), a
//! lease entry (mutual exclusion), and a notification channel (wake-ups).
//! A caller joins the queue with a fresh [`Ticket`], waits until its ticket
//! is the head, takes the lease with a conditional set, runs its operation,
//! and then always releases the lease, leaves the queue, and publishes a
//! release signal.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use prometheus_admission::config::LockConfig;
//! use prometheus_admission::core::{FifoLockManager, LockManager, LockError};
//! use prometheus_admission::infra::InMemoryCoordinationStore;
//!
//! let store = Arc::new(InMemoryCoordinationStore::new());
//! let locks = FifoLockManager::new(store, LockConfig::default());
//!
//! let seats = locks
//!     .run_exclusive("course-42", || async { Ok::<_, LockError>(30) })
//!     .await?;
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::LockConfig;
use crate::core::{CoordinationStore, LockError};
use crate::util::ids::Ticket;

/// Message published on a resource channel after every release.
pub const RELEASE_MESSAGE: &str = "next";

/// Delay strategy between lease acquisition attempts.
pub trait Backoff: Send + Sync {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    fn delay(&self, attempt: u32) -> Duration;
}

/// Constant delay between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedBackoff(pub Duration);

impl Backoff for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

/// Store keys derived from one resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKeys {
    /// Lease entry key.
    pub lock: String,
    /// Wait queue key.
    pub queue: String,
    /// Notification channel name.
    pub channel: String,
}

impl ResourceKeys {
    /// Derive the keys for `resource_id` using the configured prefixes.
    #[must_use]
    pub fn new(config: &LockConfig, resource_id: &str) -> Self {
        Self {
            lock: format!("{}{resource_id}", config.lock_prefix),
            queue: format!("{}{resource_id}", config.queue_prefix),
            channel: format!("{}{resource_id}", config.channel_prefix),
        }
    }
}

/// Runs operations under exclusive, FIFO-fair access to a named resource.
#[async_trait]
pub trait LockManager: Send + Sync {
    /// Run `operation` while no other caller runs an operation for the same
    /// `resource_id`.
    ///
    /// Lock failures are converted into `E`; errors returned by `operation`
    /// propagate unchanged. An `Ok` result means the operation ran exactly
    /// once under exclusive access.
    async fn run_exclusive<T, E, F, Fut>(&self, resource_id: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<LockError> + Send;
}

/// Queue-ordered lease lock backed by a coordination store.
pub struct FifoLockManager<S: CoordinationStore + ?Sized> {
    store: Arc<S>,
    config: LockConfig,
    backoff: Arc<dyn Backoff>,
}

impl<S: CoordinationStore + ?Sized> Clone for FifoLockManager<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
            backoff: Arc::clone(&self.backoff),
        }
    }
}

impl<S: CoordinationStore + ?Sized> fmt::Debug for FifoLockManager<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FifoLockManager")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S: CoordinationStore + ?Sized> FifoLockManager<S> {
    /// Create a lock manager with a fixed retry delay taken from `config`.
    pub fn new(store: Arc<S>, config: LockConfig) -> Self {
        let backoff = Arc::new(FixedBackoff(config.retry_delay()));
        Self {
            store,
            config,
            backoff,
        }
    }

    /// Replace the delay strategy used between acquisition attempts.
    #[must_use]
    pub fn with_backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Arc::new(backoff);
        self
    }

    /// Configuration in use.
    pub const fn config(&self) -> &LockConfig {
        &self.config
    }

    /// Underlying coordination store.
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Keys used for `resource_id`.
    #[must_use]
    pub fn keys(&self, resource_id: &str) -> ResourceKeys {
        ResourceKeys::new(&self.config, resource_id)
    }

    /// Delete the lease of `resource_id` if and only if `ticket` holds it.
    ///
    /// Returns whether a lease was deleted. Releasing a lease that was never
    /// acquired, already released, or taken over by another ticket is a no-op.
    pub async fn release_lease(&self, resource_id: &str, ticket: &Ticket) -> Result<bool, LockError> {
        let keys = self.keys(resource_id);
        Ok(release_lease(&*self.store, &keys.lock, ticket).await?)
    }

    async fn serve<T, E, F, Fut>(
        &self,
        resource_id: &str,
        keys: &ResourceKeys,
        ticket: &Ticket,
        operation: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        E: From<LockError>,
    {
        self.wait_for_turn(keys, ticket).await?;
        tracing::debug!("turn arrived for {resource_id}, ticket {ticket}");

        self.acquire(resource_id, keys, ticket).await?;
        tracing::debug!("lock acquired for {resource_id}, ticket {ticket}");

        let result = self.run_holding_lease(keys, ticket, operation()).await;
        tracing::debug!(
            "operation finished for {resource_id}, ticket {ticket}, ok={}",
            result.is_ok()
        );
        result
    }

    /// Drive `operation` to completion, extending the lease every
    /// [`LockConfig::lease_renew_interval`] so a live holder never looks stale.
    async fn run_holding_lease<T, E, Fut>(
        &self,
        keys: &ResourceKeys,
        ticket: &Ticket,
        operation: Fut,
    ) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>> + Send,
    {
        tokio::pin!(operation);
        let mut renewal = tokio::time::interval(self.config.lease_renew_interval());
        renewal.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; the lease was just taken.
        renewal.tick().await;

        loop {
            tokio::select! {
                result = &mut operation => return result,
                _ = renewal.tick() => self.renew_lease(keys, ticket).await,
            }
        }
    }

    async fn renew_lease(&self, keys: &ResourceKeys, ticket: &Ticket) {
        let ttl = self.config.lease_ttl();
        match self.store.extend_if_equal(&keys.lock, ticket.as_str(), ttl).await {
            Ok(true) => tracing::trace!("lease {} renewed for ticket {ticket}", keys.lock),
            Ok(false) => {
                tracing::warn!("lease {} is no longer held by ticket {ticket}", keys.lock);
            }
            Err(e) => tracing::warn!("failed to renew {} for ticket {ticket}: {e}", keys.lock),
        }
    }

    /// Block until `ticket` is the head of the queue.
    ///
    /// The subscription is opened before the first head read and kept for
    /// the whole wait, so a release published between two reads is never lost.
    async fn wait_for_turn(&self, keys: &ResourceKeys, ticket: &Ticket) -> Result<(), LockError> {
        let mut subscription = self.store.subscribe(&keys.channel).await?;
        let mut observed: Option<(String, Instant)> = None;

        loop {
            let head = self.store.range(&keys.queue, 0, 0).await?.into_iter().next();
            match head {
                Some(head) if *ticket == *head.as_str() => return Ok(()),
                Some(head) => self.evict_if_stale(keys, head, &mut observed).await?,
                None => {
                    tracing::warn!("queue {} is empty, rejoining with ticket {ticket}", keys.queue);
                    self.store.append(&keys.queue, ticket.as_str()).await?;
                    continue;
                }
            }

            tracing::debug!("waiting for turn on {}, ticket {ticket}", keys.queue);
            let Some(interval) = self.config.turn_recheck_interval() else {
                if subscription.recv().await.is_none() {
                    subscription = self.store.subscribe(&keys.channel).await?;
                }
                continue;
            };
            match tokio::time::timeout(interval, subscription.recv()).await {
                Ok(Some(_)) => {}
                Ok(None) => subscription = self.store.subscribe(&keys.channel).await?,
                Err(_) => self.ensure_queued(keys, ticket).await?,
            }
        }
    }

    /// Rejoin the queue if `ticket` is no longer in it.
    async fn ensure_queued(&self, keys: &ResourceKeys, ticket: &Ticket) -> Result<(), LockError> {
        let queued = self.store.range(&keys.queue, 0, -1).await?;
        if !queued.iter().any(|t| *ticket == *t.as_str()) {
            tracing::warn!("ticket {ticket} missing from {}, rejoining", keys.queue);
            self.store.append(&keys.queue, ticket.as_str()).await?;
        }
        Ok(())
    }

    /// Evict a head that has held its position without a lease for too long.
    async fn evict_if_stale(
        &self,
        keys: &ResourceKeys,
        head: String,
        observed: &mut Option<(String, Instant)>,
    ) -> Result<(), LockError> {
        if !self.config.evict_stale_heads {
            return Ok(());
        }
        let now = Instant::now();
        let since = match observed {
            Some((seen, since)) if *seen == head => *since,
            _ => {
                *observed = Some((head, now));
                return Ok(());
            }
        };
        if now.duration_since(since) < self.config.stale_head_after() {
            return Ok(());
        }
        if self.store.get(&keys.lock).await?.is_some() {
            return Ok(());
        }

        if self.store.remove_one(&keys.queue, &head).await? > 0 {
            tracing::warn!("evicted stale head {head} from {}", keys.queue);
            self.store.publish(&keys.channel, RELEASE_MESSAGE).await?;
        }
        *observed = None;
        Ok(())
    }

    /// Take the lease, retrying with the configured backoff.
    async fn acquire(
        &self,
        resource_id: &str,
        keys: &ResourceKeys,
        ticket: &Ticket,
    ) -> Result<(), LockError> {
        let ttl = self.config.lease_ttl();
        let max_retries = self.config.max_retries;
        for attempt in 1..=max_retries {
            if self.store.set_if_absent(&keys.lock, ticket.as_str(), ttl).await? {
                return Ok(());
            }
            tracing::debug!(
                "lock {} busy, retry {attempt}/{max_retries} for ticket {ticket}",
                keys.lock
            );
            if attempt < max_retries {
                tokio::time::sleep(self.backoff.delay(attempt)).await;
            }
        }
        tracing::warn!("failed to acquire lock on {resource_id} after {max_retries} attempts");
        Err(LockError::AcquisitionExhausted {
            resource: resource_id.to_string(),
            attempts: max_retries,
        })
    }
}

#[async_trait]
impl<S: CoordinationStore + ?Sized> LockManager for FifoLockManager<S> {
    async fn run_exclusive<T, E, F, Fut>(&self, resource_id: &str, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<T, E>> + Send,
        T: Send,
        E: From<LockError> + Send,
    {
        let keys = self.keys(resource_id);
        let ticket = Ticket::generate();

        // Armed before the append: a call dropped mid-append may already be queued.
        let guard = TicketGuard::new(Arc::clone(&self.store), keys.clone(), ticket.clone());
        if let Err(e) = self.store.append(&keys.queue, ticket.as_str()).await {
            guard.finish().await;
            return Err(LockError::from(e).into());
        }
        tracing::debug!("joined queue for {resource_id}, ticket {ticket}");

        let outcome = self.serve(resource_id, &keys, &ticket, operation).await;
        guard.finish().await;
        outcome
    }
}

/// Runs release, leave-queue, and notify for a ticket on every exit path.
///
/// Normal and error paths call [`TicketGuard::finish`]. If the owning future
/// is dropped first (cancellation or a panicking operation), `Drop` spawns
/// the same cleanup on the current tokio runtime.
struct TicketGuard<S: CoordinationStore + ?Sized> {
    store: Arc<S>,
    keys: ResourceKeys,
    ticket: Ticket,
    armed: bool,
}

impl<S: CoordinationStore + ?Sized> TicketGuard<S> {
    const fn new(store: Arc<S>, keys: ResourceKeys, ticket: Ticket) -> Self {
        Self {
            store,
            keys,
            ticket,
            armed: true,
        }
    }

    async fn finish(mut self) {
        cleanup(&*self.store, &self.keys, &self.ticket).await;
        self.armed = false;
    }
}

impl<S: CoordinationStore + ?Sized> Drop for TicketGuard<S> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::error!(
                "ticket {} dropped outside a runtime; lease expires after its ttl",
                self.ticket
            );
            return;
        };
        let store = Arc::clone(&self.store);
        let keys = self.keys.clone();
        let ticket = self.ticket.clone();
        handle.spawn(async move {
            cleanup(&*store, &keys, &ticket).await;
        });
    }
}

async fn release_lease<S: CoordinationStore + ?Sized>(
    store: &S,
    lock_key: &str,
    ticket: &Ticket,
) -> Result<bool, crate::core::StoreError> {
    match store.get(lock_key).await? {
        Some(holder) if *ticket == *holder.as_str() => store.delete(lock_key).await,
        _ => Ok(false),
    }
}

/// Release, leave the queue, and notify. Each step runs even if an earlier one failed.
async fn cleanup<S: CoordinationStore + ?Sized>(store: &S, keys: &ResourceKeys, ticket: &Ticket) {
    match release_lease(store, &keys.lock, ticket).await {
        Ok(true) => tracing::debug!("lock released for {}, ticket {ticket}", keys.lock),
        Ok(false) => {}
        Err(e) => tracing::warn!("failed to release {} for ticket {ticket}: {e}", keys.lock),
    }
    if let Err(e) = store.remove_one(&keys.queue, ticket.as_str()).await {
        tracing::warn!("failed to leave {} for ticket {ticket}: {e}", keys.queue);
    }
    if let Err(e) = store.publish(&keys.channel, RELEASE_MESSAGE).await {
        tracing::warn!("failed to notify {}: {e}", keys.channel);
    }
}
