// libs/shared/models/src/error.rs
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Every failure the scheduling core can report. All of these are typed
/// results surfaced to the hosting service layer; none are ambient.
///
/// Retryability: `SlotConflict` may be retried with a different window,
/// `Timeout` with backoff; the rest require the caller to change input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
pub enum SchedulingError {
    #[error("Invalid time range: {0}")]
    InvalidRange(String),

    #[error("Requested window falls outside the provider's availability")]
    OutsideAvailability,

    #[error("Requested window conflicts with {} existing appointment(s)", conflicting_ids.len())]
    SlotConflict { conflicting_ids: Vec<Uuid> },

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Appointment not found: {0}")]
    NotFound(Uuid),

    #[error("Unknown provider: {0}")]
    UnknownProvider(Uuid),

    #[error("Unknown client: {0}")]
    UnknownClient(Uuid),

    #[error("Scheduling store unavailable: gave up after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },
}

impl SchedulingError {
    /// Whether the caller may retry the same call without changing input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SchedulingError::Timeout { .. })
    }
}
