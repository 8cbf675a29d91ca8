//! Audit trail of admission decisions.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AdmissionError, AdmissionRecord};
use crate::util::clock::now_ms;

/// Outcome of one admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionAction {
    /// A record was created.
    Admit,
    /// Rejected because the resource was full.
    RejectCapacity,
    /// Rejected as a repeated submission.
    RejectDuplicate,
    /// The attempt failed for a reason other than a rejection.
    Error,
}

impl AdmissionAction {
    /// Classify the result of an admission attempt.
    #[must_use]
    pub const fn of(result: &Result<AdmissionRecord, AdmissionError>) -> Self {
        match result {
            Ok(_) => Self::Admit,
            Err(AdmissionError::CapacityExceeded { .. }) => Self::RejectCapacity,
            Err(AdmissionError::DuplicateSubmission { .. }) => Self::RejectDuplicate,
            Err(_) => Self::Error,
        }
    }

    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::RejectCapacity => "reject_capacity",
            Self::RejectDuplicate => "reject_duplicate",
            Self::Error => "error",
        }
    }

    /// Whether the participant was turned away by a capacity or duplicate rule.
    #[must_use]
    pub const fn is_rejection(self) -> bool {
        matches!(self, Self::RejectCapacity | Self::RejectDuplicate)
    }
}

impl fmt::Display for AdmissionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded admission decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique event identifier.
    pub event_id: String,
    /// Resource the decision concerns.
    pub resource: String,
    /// Participant the decision concerns.
    pub participant: String,
    /// What was decided.
    pub action: AdmissionAction,
    /// Record created by an admit.
    pub record_id: Option<u64>,
    /// Error text for failed attempts.
    pub reason: Option<String>,
    /// Timestamp milliseconds.
    pub created_at_ms: u128,
}

impl AuditEvent {
    /// Build the event describing `result`.
    #[must_use]
    pub fn from_outcome(
        resource: &str,
        participant: &str,
        result: &Result<AdmissionRecord, AdmissionError>,
    ) -> Self {
        let action = AdmissionAction::of(result);
        Self {
            event_id: Uuid::new_v4().to_string(),
            resource: resource.to_string(),
            participant: participant.to_string(),
            action,
            record_id: result.as_ref().ok().map(|r| r.id),
            reason: match result {
                Err(e) if action == AdmissionAction::Error => Some(e.to_string()),
                _ => None,
            },
            created_at_ms: now_ms(),
        }
    }
}

/// Audit sink abstraction.
pub trait AuditSink: Send {
    /// Record an audit event.
    fn record(&mut self, event: AuditEvent);
}

/// In-memory audit sink for testing and dev.
pub struct InMemoryAuditSink {
    events: VecDeque<AuditEvent>,
    max_events: usize,
}

impl InMemoryAuditSink {
    /// Create a sink keeping at most `max_events`, oldest dropped first.
    #[must_use]
    pub fn new(max_events: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
        }
    }

    /// Snapshot of stored events, oldest first.
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.iter().cloned().collect()
    }

    /// Stored events for one resource.
    #[must_use]
    pub fn events_for(&self, resource: &str) -> Vec<AuditEvent> {
        self.events
            .iter()
            .filter(|e| e.resource == resource)
            .cloned()
            .collect()
    }

    /// Number of stored events with `action`.
    #[must_use]
    pub fn count(&self, action: AdmissionAction) -> usize {
        self.events.iter().filter(|e| e.action == action).count()
    }
}

impl AuditSink for InMemoryAuditSink {
    fn record(&mut self, event: AuditEvent) {
        if self.max_events == 0 {
            return;
        }
        if self.events.len() >= self.max_events {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }
}
