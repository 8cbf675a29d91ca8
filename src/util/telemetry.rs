//! Telemetry helpers for structured logging and tracing.

use crate::core::AppResult;

/// Initialize tracing/telemetry. Users can install their own subscriber; this
/// helper installs a default env-based subscriber if none is set.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Install a subscriber with an explicit filter directive such as
/// `prometheus_admission=debug`.
///
/// Fails if the directive does not parse or a global subscriber is already set.
pub fn init_tracing_with_filter(directive: &str) -> AppResult<()> {
    let filter = tracing_subscriber::EnvFilter::try_new(directive)?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing subscriber already installed: {e}"))
}
