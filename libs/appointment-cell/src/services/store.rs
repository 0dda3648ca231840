// libs/appointment-cell/src/services/store.rs
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::time::timeout;
use tracing::{debug, warn};
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_models::{SchedulingError, TimeRange};

use crate::models::{Appointment, AppointmentStatus, RecurrenceSeries};

/// The authoritative set of appointments and recurrence series.
///
/// Mutating operations must run inside the per-provider guard obtained
/// from [`lock_provider`](Self::lock_provider); that serializes the whole
/// validate-then-commit sequence for one provider while leaving other
/// providers and all readers unblocked. Commits take the state write
/// guard only after validation, so calendar readers never observe an
/// appointment that has not passed validation.
pub struct AppointmentStore {
    state: RwLock<StoreState>,
    provider_locks: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    lock_timeout: Duration,
}

#[derive(Default)]
struct StoreState {
    appointments: HashMap<Uuid, Appointment>,
    by_provider: HashMap<Uuid, Vec<Uuid>>,
    series: HashMap<Uuid, RecurrenceSeries>,
}

impl AppointmentStore {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            provider_locks: StdMutex::new(HashMap::new()),
            lock_timeout: Duration::from_millis(config.booking_lock_timeout_ms),
        }
    }

    /// Acquire the serialization guard for one provider's appointments,
    /// bounded by the configured lock timeout.
    pub async fn lock_provider(&self, provider_id: Uuid) -> Result<OwnedMutexGuard<()>, SchedulingError> {
        let lock = {
            let mut locks = self.provider_locks.lock().expect("provider lock table poisoned");
            Arc::clone(locks.entry(provider_id).or_insert_with(|| Arc::new(Mutex::new(()))))
        };

        match timeout(self.lock_timeout, lock.lock_owned()).await {
            Ok(guard) => Ok(guard),
            Err(_) => {
                warn!("Timed out acquiring scheduling lock for provider {}", provider_id);
                Err(SchedulingError::Timeout { timeout_ms: self.lock_timeout.as_millis() as u64 })
            }
        }
    }

    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, SchedulingError> {
        self.state
            .read()
            .await
            .appointments
            .get(&appointment_id)
            .cloned()
            .ok_or(SchedulingError::NotFound(appointment_id))
    }

    pub async fn insert(&self, appointment: Appointment) {
        debug!(
            "Committing appointment {} for provider {} at {}",
            appointment.id, appointment.provider_id, appointment.window
        );
        let mut state = self.state.write().await;
        state.by_provider.entry(appointment.provider_id).or_default().push(appointment.id);
        state.appointments.insert(appointment.id, appointment);
    }

    /// Unchecked status write; transition validity is the caller's
    /// responsibility (see `LifecycleService`).
    pub async fn set_status(
        &self,
        appointment_id: Uuid,
        status: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        let mut state = self.state.write().await;
        let appointment =
            state.appointments.get_mut(&appointment_id).ok_or(SchedulingError::NotFound(appointment_id))?;
        appointment.status = status;
        appointment.last_modified_at = now;
        Ok(appointment.clone())
    }

    /// Cancel `old_id` and insert `replacement` under one state write, so
    /// no reader ever sees both (or neither) active halves of a
    /// reschedule.
    pub async fn commit_reschedule(
        &self,
        old_id: Uuid,
        replacement: Appointment,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        let mut state = self.state.write().await;
        let old = state.appointments.get_mut(&old_id).ok_or(SchedulingError::NotFound(old_id))?;
        old.status = AppointmentStatus::Cancelled;
        old.last_modified_at = now;

        state.by_provider.entry(replacement.provider_id).or_default().push(replacement.id);
        state.appointments.insert(replacement.id, replacement.clone());
        Ok(replacement)
    }

    /// All slot-blocking (`scheduled`/`confirmed`) appointments of the
    /// provider whose windows overlap `window`.
    pub async fn active_overlapping(
        &self,
        provider_id: Uuid,
        window: TimeRange,
        exclude: Option<Uuid>,
    ) -> Vec<Appointment> {
        let state = self.state.read().await;
        let ids = state.by_provider.get(&provider_id).map(Vec::as_slice).unwrap_or_default();

        let mut overlapping: Vec<Appointment> = ids
            .iter()
            .filter_map(|id| state.appointments.get(id))
            .filter(|appointment| {
                appointment.status.blocks_slot()
                    && Some(appointment.id) != exclude
                    && appointment.window.overlaps(&window)
            })
            .cloned()
            .collect();
        overlapping.sort_by_key(|appointment| appointment.window.start());
        overlapping
    }

    /// Every appointment (any status) whose window overlaps `window`.
    pub async fn in_window(&self, window: TimeRange) -> Vec<Appointment> {
        self.state
            .read()
            .await
            .appointments
            .values()
            .filter(|appointment| appointment.window.overlaps(&window))
            .cloned()
            .collect()
    }

    pub async fn insert_series(&self, series: RecurrenceSeries) {
        debug!("Recording series {} with {} member(s)", series.id, series.appointment_ids.len());
        self.state.write().await.series.insert(series.id, series);
    }

    pub async fn get_series(&self, series_id: Uuid) -> Result<RecurrenceSeries, SchedulingError> {
        self.state
            .read()
            .await
            .series
            .get(&series_id)
            .cloned()
            .ok_or(SchedulingError::NotFound(series_id))
    }

    /// Point the series at a rescheduled member's replacement id.
    pub async fn replace_series_member(
        &self,
        series_id: Uuid,
        old_id: Uuid,
        new_id: Uuid,
    ) -> Result<(), SchedulingError> {
        let mut state = self.state.write().await;
        let series = state.series.get_mut(&series_id).ok_or(SchedulingError::NotFound(series_id))?;
        for member in series.appointment_ids.iter_mut() {
            if *member == old_id {
                *member = new_id;
            }
        }
        Ok(())
    }
}
