//! Lock, admission, and service configuration structures.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Lock manager configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Lease lifetime in milliseconds.
    pub lease_ttl_ms: u64,
    /// Maximum conditional-set attempts once at the head of the queue.
    pub max_retries: u32,
    /// Fixed delay between acquisition attempts in milliseconds.
    pub retry_delay_ms: u64,
    /// Interval at which a waiter re-reads the queue head without a
    /// notification. `None` waits for notifications only.
    pub turn_recheck_interval_ms: Option<u64>,
    /// Whether waiters evict a head ticket that holds no lease and makes no progress.
    pub evict_stale_heads: bool,
    /// How long a lease-less head must stay unchanged before eviction.
    /// Defaults to the lease lifetime.
    pub stale_head_after_ms: Option<u64>,
    /// Prefix of lease keys.
    pub lock_prefix: String,
    /// Prefix of wait-queue keys.
    pub queue_prefix: String,
    /// Prefix of notification channel names.
    pub channel_prefix: String,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            lease_ttl_ms: 30_000,
            max_retries: 40,
            retry_delay_ms: 100,
            turn_recheck_interval_ms: Some(1_000),
            evict_stale_heads: true,
            stale_head_after_ms: None,
            lock_prefix: "lock:".into(),
            queue_prefix: "queue:".into(),
            channel_prefix: "channel:".into(),
        }
    }
}

impl LockConfig {
    /// Lease lifetime.
    #[must_use]
    pub const fn lease_ttl(&self) -> Duration {
        Duration::from_millis(self.lease_ttl_ms)
    }

    /// How often a holder extends its lease while the operation runs.
    ///
    /// A third of the lease lifetime, never below one millisecond.
    #[must_use]
    pub fn lease_renew_interval(&self) -> Duration {
        (self.lease_ttl() / 3).max(Duration::from_millis(1))
    }

    /// Delay between acquisition attempts.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Periodic head re-check interval, if enabled.
    #[must_use]
    pub fn turn_recheck_interval(&self) -> Option<Duration> {
        self.turn_recheck_interval_ms.map(Duration::from_millis)
    }

    /// Age after which a lease-less, unchanged head counts as stale.
    #[must_use]
    pub fn stale_head_after(&self) -> Duration {
        Duration::from_millis(self.stale_head_after_ms.unwrap_or(self.lease_ttl_ms))
    }

    /// Validate lock configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.lease_ttl_ms == 0 {
            return Err("lease_ttl_ms must be greater than 0".into());
        }
        if self.max_retries == 0 {
            return Err("max_retries must be greater than 0".into());
        }
        if self.turn_recheck_interval_ms == Some(0) {
            return Err("turn_recheck_interval_ms must be greater than 0 when set".into());
        }
        if self.evict_stale_heads {
            let Some(recheck) = self.turn_recheck_interval() else {
                return Err("evict_stale_heads requires turn_recheck_interval_ms".into());
            };
            if self.stale_head_after() <= recheck {
                return Err("stale_head_after_ms must exceed turn_recheck_interval_ms".into());
            }
        }
        let prefixes = [
            ("lock_prefix", &self.lock_prefix),
            ("queue_prefix", &self.queue_prefix),
            ("channel_prefix", &self.channel_prefix),
        ];
        for (name, prefix) in prefixes {
            if prefix.is_empty() {
                return Err(format!("{name} must not be empty"));
            }
        }
        for (i, (a_name, a)) in prefixes.iter().enumerate() {
            for (b_name, b) in prefixes.iter().skip(i + 1) {
                if a.starts_with(b.as_str()) || b.starts_with(a.as_str()) {
                    return Err(format!("{a_name} and {b_name} overlap"));
                }
            }
        }
        Ok(())
    }
}

/// Admission controller configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Lifetime of the per-participant duplicate marker in seconds.
    pub duplicate_window_secs: u64,
    /// Key of the advisory applied-count; `{resource}` is substituted.
    pub counter_key_template: String,
    /// Key of the duplicate marker; `{participant}` and `{resource}` are substituted.
    pub marker_key_template: String,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            duplicate_window_secs: 10,
            counter_key_template: "course:{resource}:applies".into(),
            marker_key_template: "user:{participant}:applied:{resource}".into(),
        }
    }
}

impl AdmissionConfig {
    /// Duplicate-suppression window.
    #[must_use]
    pub const fn duplicate_window(&self) -> Duration {
        Duration::from_secs(self.duplicate_window_secs)
    }

    /// Advisory counter key for `resource`.
    #[must_use]
    pub fn counter_key(&self, resource: &str) -> String {
        self.counter_key_template.replace("{resource}", resource)
    }

    /// Duplicate marker key for `participant` on `resource`.
    #[must_use]
    pub fn marker_key(&self, participant: &str, resource: &str) -> String {
        self.marker_key_template
            .replace("{participant}", participant)
            .replace("{resource}", resource)
    }

    /// Validate admission configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.duplicate_window_secs == 0 {
            return Err("duplicate_window_secs must be greater than 0".into());
        }
        if !self.counter_key_template.contains("{resource}") {
            return Err("counter_key_template must contain {resource}".into());
        }
        if !self.marker_key_template.contains("{resource}")
            || !self.marker_key_template.contains("{participant}")
        {
            return Err("marker_key_template must contain {participant} and {resource}".into());
        }
        Ok(())
    }
}

/// Root service configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Lock manager settings.
    pub lock: LockConfig,
    /// Admission controller settings.
    pub admission: AdmissionConfig,
}

impl ServiceConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.lock.validate().map_err(|e| format!("lock: {e}"))?;
        self.admission
            .validate()
            .map_err(|e| format!("admission: {e}"))?;
        Ok(())
    }

    /// Parse service configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from defaults overridden by `ADMISSION_*`
    /// environment variables, loading a `.env` file first if present.
    ///
    /// Recognised variables: `ADMISSION_LEASE_TTL_MS`, `ADMISSION_MAX_RETRIES`,
    /// `ADMISSION_RETRY_DELAY_MS`, `ADMISSION_TURN_RECHECK_MS` (`0` disables),
    /// `ADMISSION_EVICT_STALE_HEADS`, `ADMISSION_DUPLICATE_WINDOW_SECS`.
    pub fn from_env() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parsed<T: std::str::FromStr>(
            lookup: &impl Fn(&str) -> Option<String>,
            key: &str,
        ) -> AppResult<Option<T>>
        where
            T::Err: std::fmt::Display,
        {
            lookup(key)
                .map(|raw| {
                    raw.trim()
                        .parse::<T>()
                        .map_err(|e| anyhow::anyhow!("{key}: {e}"))
                })
                .transpose()
        }

        let mut cfg = Self::default();
        if let Some(v) = parsed(&lookup, "ADMISSION_LEASE_TTL_MS")? {
            cfg.lock.lease_ttl_ms = v;
        }
        if let Some(v) = parsed(&lookup, "ADMISSION_MAX_RETRIES")? {
            cfg.lock.max_retries = v;
        }
        if let Some(v) = parsed(&lookup, "ADMISSION_RETRY_DELAY_MS")? {
            cfg.lock.retry_delay_ms = v;
        }
        if let Some(v) = parsed::<u64>(&lookup, "ADMISSION_TURN_RECHECK_MS")? {
            cfg.lock.turn_recheck_interval_ms = (v > 0).then_some(v);
            if v == 0 {
                cfg.lock.evict_stale_heads = false;
            }
        }
        if let Some(v) = parsed(&lookup, "ADMISSION_EVICT_STALE_HEADS")? {
            cfg.lock.evict_stale_heads = v;
        }
        if let Some(v) = parsed(&lookup, "ADMISSION_DUPLICATE_WINDOW_SECS")? {
            cfg.admission.duplicate_window_secs = v;
        }
        cfg.validate().map_err(|e| anyhow::anyhow!(e))?;
        Ok(cfg)
    }
}
