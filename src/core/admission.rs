//! Capacity-limited admission control.
//!
//! Admission runs in two phases. The fast path reads an advisory applied
//! count and sets a short-lived duplicate marker in the coordination store;
//! both are cheap and may be stale. The authoritative phase runs under the
//! resource lock, recounts admissions in the system of record, and only then
//! commits. Only the authoritative phase guards the capacity invariant.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::AdmissionConfig;
use crate::core::{
    AdmissionError, AdmissionRecord, AdmissionRepository, AuditEvent, AuditSink, CoordinationStore,
    LockManager,
};

/// Decides whether a participant may take one of a resource's limited seats.
pub struct AdmissionController<S, R, L>
where
    S: CoordinationStore + ?Sized,
    R: AdmissionRepository + ?Sized,
{
    store: Arc<S>,
    records: Arc<R>,
    locks: L,
    config: AdmissionConfig,
    audit: Option<Arc<Mutex<dyn AuditSink>>>,
}

impl<S, R, L> AdmissionController<S, R, L>
where
    S: CoordinationStore + ?Sized,
    R: AdmissionRepository + ?Sized,
    L: LockManager,
{
    /// Create a controller from its collaborators.
    pub fn new(store: Arc<S>, records: Arc<R>, locks: L, config: AdmissionConfig) -> Self {
        Self {
            store,
            records,
            locks,
            config,
            audit: None,
        }
    }

    /// Attach an audit sink.
    #[must_use]
    pub fn with_audit(mut self, audit: Arc<Mutex<dyn AuditSink>>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Lock manager used for the authoritative phase.
    pub const fn locks(&self) -> &L {
        &self.locks
    }

    /// Configuration in use.
    pub const fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Admit `participant_id` to `resource_id` if fewer than `capacity`
    /// admissions exist and the participant has not just submitted.
    ///
    /// # Errors
    ///
    /// - [`AdmissionError::CapacityExceeded`] from the fast path or the authoritative recount.
    /// - [`AdmissionError::DuplicateSubmission`] inside the suppression window, or when
    ///   the system of record already holds this pair.
    /// - [`AdmissionError::LockAcquisitionExhausted`] when the resource stayed locked.
    pub async fn admit(
        &self,
        resource_id: &str,
        participant_id: &str,
        capacity: u32,
    ) -> Result<AdmissionRecord, AdmissionError> {
        let result = self.try_admit(resource_id, participant_id, capacity).await;
        self.record_outcome(resource_id, participant_id, &result);
        result
    }

    async fn try_admit(
        &self,
        resource_id: &str,
        participant_id: &str,
        capacity: u32,
    ) -> Result<AdmissionRecord, AdmissionError> {
        let applied = self.applied_count(resource_id).await?;
        if applied >= u64::from(capacity) {
            tracing::debug!("fast path rejected {participant_id} for {resource_id}: {applied}/{capacity}");
            return Err(AdmissionError::CapacityExceeded {
                resource: resource_id.to_string(),
                capacity,
            });
        }

        // Check and set in one step so concurrent resubmissions cannot both pass.
        let marker = self.config.marker_key(participant_id, resource_id);
        let fresh = self
            .store
            .set_if_absent(&marker, "true", self.config.duplicate_window())
            .await?;
        if !fresh {
            return Err(AdmissionError::DuplicateSubmission {
                participant: participant_id.to_string(),
                resource: resource_id.to_string(),
            });
        }

        let records = &self.records;
        let store = &self.store;
        let counter_key = self.config.counter_key(resource_id);
        self.locks
            .run_exclusive(resource_id, || async move {
                let admitted = records.count_admissions(resource_id).await?;
                if admitted >= u64::from(capacity) {
                    return Err(AdmissionError::CapacityExceeded {
                        resource: resource_id.to_string(),
                        capacity,
                    });
                }

                let record = records.create_admission(participant_id, resource_id).await?;
                if let Err(e) = store.increment(&counter_key).await {
                    tracing::warn!("failed to bump applied count {counter_key}: {e}");
                }
                Ok(record)
            })
            .await
    }

    /// All admissions held by `participant_id`.
    pub async fn admissions_for(
        &self,
        participant_id: &str,
    ) -> Result<Vec<AdmissionRecord>, AdmissionError> {
        Ok(self
            .records
            .find_admissions_by_participant(participant_id)
            .await?)
    }

    /// Overwrite the advisory applied count with the authoritative count.
    ///
    /// Runs under the resource lock so no admission commits in between.
    pub async fn sync_applied_count(&self, resource_id: &str) -> Result<u64, AdmissionError> {
        let records = &self.records;
        let store = &self.store;
        let counter_key = self.config.counter_key(resource_id);
        let count = self
            .locks
            .run_exclusive(resource_id, || async move {
                let count = records.count_admissions(resource_id).await?;
                store.set(&counter_key, &count.to_string(), None).await?;
                Ok::<_, AdmissionError>(count)
            })
            .await?;
        tracing::info!("applied count for {resource_id} resynced to {count}");
        Ok(count)
    }

    /// Advisory applied count; missing or unreadable values count as zero.
    async fn applied_count(&self, resource_id: &str) -> Result<u64, AdmissionError> {
        let key = self.config.counter_key(resource_id);
        let Some(raw) = self.store.get(&key).await? else {
            return Ok(0);
        };
        Ok(raw.parse().unwrap_or_else(|_| {
            tracing::warn!("ignoring unreadable applied count {raw:?} at {key}");
            0
        }))
    }

    fn record_outcome(
        &self,
        resource_id: &str,
        participant_id: &str,
        result: &Result<AdmissionRecord, AdmissionError>,
    ) {
        match result {
            Ok(record) => {
                tracing::info!("admitted {participant_id} to {resource_id} as record {}", record.id);
            }
            Err(
                e @ (AdmissionError::CapacityExceeded { .. }
                | AdmissionError::DuplicateSubmission { .. }),
            ) => {
                tracing::warn!("rejected {participant_id} for {resource_id}: {e}");
            }
            Err(e) => tracing::error!("admission of {participant_id} to {resource_id} failed: {e}"),
        }

        if let Some(audit) = &self.audit {
            audit
                .lock()
                .record(AuditEvent::from_outcome(resource_id, participant_id, result));
        }
    }
}
