// libs/appointment-cell/src/services/lifecycle.rs
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use shared_models::SchedulingError;

use crate::models::AppointmentStatus;

/// The appointment status state machine:
/// `scheduled -> confirmed -> completed`, with cancellation allowed from
/// either active status and `no_show` allowed from either active status
/// once the appointment's end time has passed. Terminal statuses accept
/// no further transitions.
pub struct LifecycleService;

impl LifecycleService {
    pub fn new() -> Self {
        Self
    }

    pub fn valid_transitions_from(&self, current: &AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Scheduled => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
                AppointmentStatus::NoShow,
            ],
            // Terminal
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow => {
                vec![]
            }
        }
    }

    /// Validate one transition. `window_end` and `now` gate `NoShow`,
    /// which is only reachable after the appointment has ended. Failing
    /// validation leaves the appointment untouched.
    pub fn validate_transition(
        &self,
        current: &AppointmentStatus,
        next: &AppointmentStatus,
        window_end: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        debug!("Validating status transition {} -> {}", current, next);

        if !self.valid_transitions_from(current).contains(next) {
            warn!("Invalid status transition attempted: {} -> {}", current, next);
            return Err(SchedulingError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        if *next == AppointmentStatus::NoShow && now < window_end {
            warn!("No-show attempted before appointment end ({} < {})", now, window_end);
            return Err(SchedulingError::InvalidTransition {
                from: current.to_string(),
                to: next.to_string(),
            });
        }

        Ok(())
    }
}

impl Default for LifecycleService {
    fn default() -> Self {
        Self::new()
    }
}
