// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use availability_cell::AvailabilityService;
use shared_config::SchedulingConfig;
use shared_models::{DirectoryLookup, ReminderSink, SchedulingError, TimeRange};

use crate::models::{
    Appointment, AppointmentStatus, BookingRequest, RecurrenceEnd, RecurrenceRule, RecurrenceSeries,
    SeriesBookingRequest, SeriesFailure, SeriesOutcome,
};
use crate::services::conflict::ConflictService;
use crate::services::lifecycle::LifecycleService;
use crate::services::store::AppointmentStore;

/// The conflict resolver: admits or rejects booking requests against
/// availability and the existing appointment set, owns the status
/// transitions, and fans series operations out to their members.
///
/// Every admission runs under the provider's store guard, so two
/// concurrent bookings for the same provider are serialized and can
/// never both claim overlapping windows. Time is always an explicit
/// `now` parameter; the service never reads an ambient clock.
pub struct BookingService {
    store: Arc<AppointmentStore>,
    availability: Arc<AvailabilityService>,
    directory: Arc<dyn DirectoryLookup>,
    reminders: Arc<dyn ReminderSink>,
    conflict_service: ConflictService,
    lifecycle_service: LifecycleService,
    config: SchedulingConfig,
}

impl BookingService {
    pub fn new(
        store: Arc<AppointmentStore>,
        availability: Arc<AvailabilityService>,
        directory: Arc<dyn DirectoryLookup>,
        reminders: Arc<dyn ReminderSink>,
        config: SchedulingConfig,
    ) -> Self {
        let conflict_service = ConflictService::new(Arc::clone(&store));
        Self {
            store,
            availability,
            directory,
            reminders,
            conflict_service,
            lifecycle_service: LifecycleService::new(),
            config,
        }
    }

    // ==========================================================================
    // SINGLE-APPOINTMENT OPERATIONS
    // ==========================================================================

    pub async fn book(
        &self,
        request: BookingRequest,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        self.check_identities(request.provider_id, request.client_id).await?;
        self.book_occurrence(&request, None, now).await
    }

    pub async fn confirm(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        self.transition(appointment_id, AppointmentStatus::Confirmed, now).await
    }

    pub async fn complete(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        self.transition(appointment_id, AppointmentStatus::Completed, now).await
    }

    pub async fn cancel(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        self.transition(appointment_id, AppointmentStatus::Cancelled, now).await
    }

    pub async fn mark_no_show(
        &self,
        appointment_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        self.transition(appointment_id, AppointmentStatus::NoShow, now).await
    }

    /// Cancel-plus-recreate under one provider guard. The replacement
    /// keeps the client, service line, modality, and `recurrence_id` of
    /// the original; the new window is validated exactly like a fresh
    /// booking, excluding the appointment being moved from conflict
    /// detection.
    pub async fn reschedule(
        &self,
        appointment_id: Uuid,
        new_window: TimeRange,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.store.get(appointment_id).await?;
        let guard = self.store.lock_provider(current.provider_id).await?;
        // Re-read under the guard; a concurrent operation may have moved it.
        let current = self.store.get(appointment_id).await?;

        // The original must still be cancellable, or the swap is illegal.
        self.lifecycle_service.validate_transition(
            &current.status,
            &AppointmentStatus::Cancelled,
            current.window.end(),
            now,
        )?;
        self.check_window(current.provider_id, new_window, Some(appointment_id), now).await?;

        let replacement = Appointment {
            id: Uuid::new_v4(),
            provider_id: current.provider_id,
            client_id: current.client_id,
            window: new_window,
            service_line: current.service_line,
            modality: current.modality,
            status: AppointmentStatus::Scheduled,
            recurrence_id: current.recurrence_id,
            created_at: now,
            last_modified_at: now,
        };
        let replacement = self.store.commit_reschedule(appointment_id, replacement, now).await?;

        if let Some(series_id) = replacement.recurrence_id {
            // Series may not exist when recurrence_id came from an external import.
            let _ = self.store.replace_series_member(series_id, appointment_id, replacement.id).await;
        }
        drop(guard);

        info!("Rescheduled appointment {} to {} as {}", appointment_id, new_window, replacement.id);
        self.reminders.appointment_changed(appointment_id, current.window, false).await;
        self.reminders.appointment_changed(replacement.id, replacement.window, true).await;
        Ok(replacement)
    }

    // ==========================================================================
    // SERIES OPERATIONS
    // ==========================================================================

    /// Materialize a recurring series: expand the rule into a bounded set
    /// of occurrences and book each one independently. Occurrences that
    /// cannot be booked are reported in the outcome, never rolled into a
    /// single opaque error.
    pub async fn book_series(
        &self,
        request: SeriesBookingRequest,
        now: DateTime<Utc>,
    ) -> Result<SeriesOutcome, SchedulingError> {
        self.check_identities(request.provider_id, request.client_id).await?;

        let occurrences = expand_rule(&request.rule, self.config.max_series_occurrences)?;
        let series_id = Uuid::new_v4();
        info!(
            "Booking series {} for provider {}: {} occurrence(s)",
            series_id,
            request.provider_id,
            occurrences.len()
        );

        let mut outcome = SeriesOutcome::new(series_id);
        for window in occurrences {
            let occurrence = BookingRequest {
                provider_id: request.provider_id,
                client_id: request.client_id,
                window,
                service_line: request.service_line,
                modality: request.modality,
            };
            match self.book_occurrence(&occurrence, Some(series_id), now).await {
                Ok(appointment) => outcome.succeeded.push(appointment.id),
                Err(error) => {
                    outcome.failed.push(SeriesFailure { appointment_id: None, window, error })
                }
            }
        }

        self.store
            .insert_series(RecurrenceSeries {
                id: series_id,
                provider_id: request.provider_id,
                client_id: request.client_id,
                rule: request.rule,
                appointment_ids: outcome.succeeded.clone(),
            })
            .await;
        Ok(outcome)
    }

    /// Cancel every non-terminal member. Cooperative: the optional
    /// deadline is checked between members, and members already
    /// cancelled stay cancelled when it expires.
    pub async fn cancel_series(
        &self,
        series_id: Uuid,
        now: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> Result<SeriesOutcome, SchedulingError> {
        let series = self.store.get_series(series_id).await?;
        let mut outcome = SeriesOutcome::new(series_id);

        for appointment_id in series.appointment_ids {
            if deadline_passed(deadline) {
                outcome.stopped_early = true;
                break;
            }
            let appointment = match self.store.get(appointment_id).await {
                Ok(appointment) => appointment,
                Err(error) => {
                    outcome.failed.push(SeriesFailure {
                        appointment_id: Some(appointment_id),
                        window: series_member_window_fallback(&series.rule, now),
                        error,
                    });
                    continue;
                }
            };
            if appointment.status.is_terminal() {
                continue;
            }
            match self.cancel(appointment_id, now).await {
                Ok(_) => outcome.succeeded.push(appointment_id),
                Err(error) => outcome.failed.push(SeriesFailure {
                    appointment_id: Some(appointment_id),
                    window: appointment.window,
                    error,
                }),
            }
        }

        info!(
            "Series {} cancellation: {} cancelled, {} failed, stopped_early={}",
            series_id,
            outcome.succeeded.len(),
            outcome.failed.len(),
            outcome.stopped_early
        );
        Ok(outcome)
    }

    /// Move every non-terminal member to new start/end times of day on
    /// the member's own date. Each member is validated independently;
    /// members that cannot move are reported and the rest proceed.
    pub async fn reschedule_series(
        &self,
        series_id: Uuid,
        new_start_time: NaiveTime,
        new_end_time: NaiveTime,
        now: DateTime<Utc>,
        deadline: Option<Instant>,
    ) -> Result<SeriesOutcome, SchedulingError> {
        if new_start_time >= new_end_time {
            return Err(SchedulingError::InvalidRange(format!(
                "series start {} must be before end {}",
                new_start_time, new_end_time
            )));
        }

        let series = self.store.get_series(series_id).await?;
        let mut outcome = SeriesOutcome::new(series_id);

        for appointment_id in series.appointment_ids {
            if deadline_passed(deadline) {
                outcome.stopped_early = true;
                break;
            }
            let appointment = match self.store.get(appointment_id).await {
                Ok(appointment) => appointment,
                Err(error) => {
                    outcome.failed.push(SeriesFailure {
                        appointment_id: Some(appointment_id),
                        window: series_member_window_fallback(&series.rule, now),
                        error,
                    });
                    continue;
                }
            };
            if appointment.status.is_terminal() {
                continue;
            }

            let day = appointment.window.start().date_naive();
            let new_window = match TimeRange::new(
                day.and_time(new_start_time).and_utc(),
                day.and_time(new_end_time).and_utc(),
            ) {
                Ok(window) => window,
                Err(error) => {
                    outcome.failed.push(SeriesFailure {
                        appointment_id: Some(appointment_id),
                        window: appointment.window,
                        error,
                    });
                    continue;
                }
            };

            match self.reschedule(appointment_id, new_window, now).await {
                Ok(replacement) => outcome.succeeded.push(replacement.id),
                Err(error) => outcome.failed.push(SeriesFailure {
                    appointment_id: Some(appointment_id),
                    window: appointment.window,
                    error,
                }),
            }
        }

        Ok(outcome)
    }

    // ==========================================================================
    // PRIVATE HELPERS
    // ==========================================================================

    /// Steps 1-4 of the admission algorithm for one occurrence, executed
    /// under the provider guard.
    async fn book_occurrence(
        &self,
        request: &BookingRequest,
        recurrence_id: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        debug!(
            "Booking request: provider {} client {} window {}",
            request.provider_id, request.client_id, request.window
        );

        let guard = self.store.lock_provider(request.provider_id).await?;
        self.check_window(request.provider_id, request.window, None, now).await?;

        let appointment = Appointment {
            id: Uuid::new_v4(),
            provider_id: request.provider_id,
            client_id: request.client_id,
            window: request.window,
            service_line: request.service_line,
            modality: request.modality,
            status: AppointmentStatus::Scheduled,
            recurrence_id,
            created_at: now,
            last_modified_at: now,
        };
        self.store.insert(appointment.clone()).await;
        drop(guard);

        info!(
            "Booked appointment {} ({} / {:?}) for provider {} at {}",
            appointment.id,
            appointment.service_line,
            appointment.modality,
            appointment.provider_id,
            appointment.window
        );
        self.reminders.appointment_changed(appointment.id, appointment.window, true).await;
        Ok(appointment)
    }

    /// Past-window rejection, availability containment, and conflict
    /// detection for a candidate window. Caller holds the provider guard.
    async fn check_window(
        &self,
        provider_id: Uuid,
        window: TimeRange,
        exclude: Option<Uuid>,
        now: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        let leniency = Duration::minutes(self.config.past_booking_leniency_minutes);
        if window.start() < now - leniency {
            warn!("Rejecting past-dated window {} (now {})", window, now);
            return Err(SchedulingError::InvalidRange(format!(
                "window starting {} is in the past",
                window.start()
            )));
        }

        let available = self.availability.resolve_available(provider_id, window).await;
        if !available.iter().any(|range| range.contains(&window)) {
            debug!("Window {} outside availability for provider {}", window, provider_id);
            return Err(SchedulingError::OutsideAvailability);
        }

        self.conflict_service.ensure_free(provider_id, window, exclude).await
    }

    async fn transition(
        &self,
        appointment_id: Uuid,
        next: AppointmentStatus,
        now: DateTime<Utc>,
    ) -> Result<Appointment, SchedulingError> {
        let appointment = self.store.get(appointment_id).await?;
        let guard = self.store.lock_provider(appointment.provider_id).await?;
        let appointment = self.store.get(appointment_id).await?;

        self.lifecycle_service.validate_transition(
            &appointment.status,
            &next,
            appointment.window.end(),
            now,
        )?;
        let updated = self.store.set_status(appointment_id, next, now).await?;
        drop(guard);

        info!("Appointment {} transitioned {} -> {}", appointment_id, appointment.status, next);
        self.reminders
            .appointment_changed(updated.id, updated.window, !updated.status.is_terminal())
            .await;
        Ok(updated)
    }

    async fn check_identities(&self, provider_id: Uuid, client_id: Uuid) -> Result<(), SchedulingError> {
        if !self.directory.provider_exists(provider_id).await {
            return Err(SchedulingError::UnknownProvider(provider_id));
        }
        if !self.directory.client_exists(client_id).await {
            return Err(SchedulingError::UnknownClient(client_id));
        }
        Ok(())
    }
}

fn deadline_passed(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// Expand a weekly rule into concrete occurrence windows, capped so the
/// expansion is always finite.
fn expand_rule(rule: &RecurrenceRule, cap: u32) -> Result<Vec<TimeRange>, SchedulingError> {
    if rule.start_time >= rule.end_time {
        return Err(SchedulingError::InvalidRange(format!(
            "recurrence start {} must be before end {}",
            rule.start_time, rule.end_time
        )));
    }

    let mut first = rule.starts_on;
    while first.weekday() != rule.weekday {
        first = first.succ_opt().ok_or_else(|| {
            SchedulingError::InvalidRange("recurrence start date out of range".to_string())
        })?;
    }

    let mut occurrences = Vec::new();
    let mut day = first;
    loop {
        match rule.end {
            RecurrenceEnd::Count(count) => {
                if occurrences.len() as u32 >= count.min(cap) {
                    break;
                }
            }
            RecurrenceEnd::Until(until) => {
                if day > until || occurrences.len() as u32 >= cap {
                    break;
                }
            }
        }

        // Rule times already validated above.
        if let Ok(window) =
            TimeRange::new(day.and_time(rule.start_time).and_utc(), day.and_time(rule.end_time).and_utc())
        {
            occurrences.push(window);
        }
        day += Duration::days(7);
    }
    Ok(occurrences)
}

/// Placeholder window for failure reports about members whose record is
/// missing entirely; uses the rule's times on the current date.
fn series_member_window_fallback(rule: &RecurrenceRule, now: DateTime<Utc>) -> TimeRange {
    let day = now.date_naive();
    TimeRange::new(day.and_time(rule.start_time).and_utc(), day.and_time(rule.end_time).and_utc())
        .unwrap_or_else(|_| {
            // Rule times are validated at series creation; this arm is
            // unreachable for stored series.
            TimeRange::new(now, now + Duration::minutes(1)).expect("one-minute range is valid")
        })
}
