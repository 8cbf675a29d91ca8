//! Identifier types shared by the lock manager and admission controller.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of one queued lock request.
///
/// A ticket lives for exactly one `run_exclusive` call: it is created when
/// the caller joins the wait queue and discarded once it has left it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(String);

impl Ticket {
    /// Generate a fresh random ticket.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// String form stored in the coordination store.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Ticket {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
