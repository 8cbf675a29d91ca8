//! Builders to construct the admission stack from configuration.

use std::sync::Arc;

use crate::config::ServiceConfig;
use crate::core::{
    AdmissionController, AdmissionError, AdmissionRepository, CoordinationStore, FifoLockManager,
};
use crate::infra::{InMemoryAdmissionRepository, InMemoryCoordinationStore};

/// Admission controller wired to the in-memory backends.
pub type InMemoryAdmissionController = AdmissionController<
    InMemoryCoordinationStore,
    InMemoryAdmissionRepository,
    FifoLockManager<InMemoryCoordinationStore>,
>;

/// Validate `cfg` and build a controller whose lock manager shares `store`.
pub fn build_controller<S, R>(
    cfg: &ServiceConfig,
    store: Arc<S>,
    records: Arc<R>,
) -> Result<AdmissionController<S, R, FifoLockManager<S>>, AdmissionError>
where
    S: CoordinationStore + ?Sized,
    R: AdmissionRepository + ?Sized,
{
    cfg.validate().map_err(AdmissionError::Config)?;

    let locks = FifoLockManager::new(Arc::clone(&store), cfg.lock.clone());
    Ok(AdmissionController::new(
        store,
        records,
        locks,
        cfg.admission.clone(),
    ))
}

/// Build a controller over fresh in-memory backends.
///
/// Returns the controller together with the store and repository so callers
/// can inspect or share them.
pub fn build_in_memory(
    cfg: &ServiceConfig,
) -> Result<
    (
        InMemoryAdmissionController,
        Arc<InMemoryCoordinationStore>,
        Arc<InMemoryAdmissionRepository>,
    ),
    AdmissionError,
> {
    let store = Arc::new(InMemoryCoordinationStore::new());
    let records = Arc::new(InMemoryAdmissionRepository::new());
    let controller = build_controller(cfg, Arc::clone(&store), Arc::clone(&records))?;
    Ok((controller, store, records))
}
