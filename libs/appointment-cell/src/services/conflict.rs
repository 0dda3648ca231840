// libs/appointment-cell/src/services/conflict.rs
use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use shared_models::{SchedulingError, TimeRange};

use crate::models::Appointment;
use crate::services::store::AppointmentStore;

/// Detects double-booking: overlap between a candidate window and the
/// provider's existing slot-blocking appointments. Cancelled, completed,
/// and no-show appointments never block a slot.
pub struct ConflictService {
    store: Arc<AppointmentStore>,
}

impl ConflictService {
    pub fn new(store: Arc<AppointmentStore>) -> Self {
        Self { store }
    }

    /// The provider's active appointments overlapping `window`, oldest
    /// start first. `exclude` skips the appointment being rescheduled.
    pub async fn find_conflicts(
        &self,
        provider_id: Uuid,
        window: TimeRange,
        exclude: Option<Uuid>,
    ) -> Vec<Appointment> {
        debug!("Checking conflicts for provider {} in {}", provider_id, window);
        self.store.active_overlapping(provider_id, window, exclude).await
    }

    /// Fails with `SlotConflict` naming every conflicting appointment id
    /// if the window is already taken.
    pub async fn ensure_free(
        &self,
        provider_id: Uuid,
        window: TimeRange,
        exclude: Option<Uuid>,
    ) -> Result<(), SchedulingError> {
        let conflicts = self.find_conflicts(provider_id, window, exclude).await;
        if conflicts.is_empty() {
            return Ok(());
        }

        warn!(
            "Conflict detected for provider {}: {} overlapping appointment(s)",
            provider_id,
            conflicts.len()
        );
        Err(SchedulingError::SlotConflict {
            conflicting_ids: conflicts.into_iter().map(|appointment| appointment.id).collect(),
        })
    }
}
