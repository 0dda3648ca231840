// libs/appointment-cell/src/services/calendar.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::debug;

use crate::models::{Appointment, CalendarQuery};
use crate::services::store::AppointmentStore;

/// Read-only calendar range queries over the appointment store. Always
/// reflects the latest committed state; bookings commit under a single
/// store write, so a query never sees a half-validated appointment.
pub struct CalendarService {
    store: Arc<AppointmentStore>,
}

impl CalendarService {
    pub fn new(store: Arc<AppointmentStore>) -> Self {
        Self { store }
    }

    /// Every appointment (any status) overlapping the query window,
    /// optionally filtered by provider and service line, sorted by
    /// `(provider_id, start)`.
    pub async fn calendar(&self, query: &CalendarQuery) -> Vec<Appointment> {
        let mut appointments = self.store.in_window(query.window).await;

        if let Some(provider_id) = query.provider_id {
            appointments.retain(|appointment| appointment.provider_id == provider_id);
        }
        if let Some(service_line) = query.service_line {
            appointments.retain(|appointment| appointment.service_line == service_line);
        }

        appointments.sort_by_key(|appointment| (appointment.provider_id, appointment.window.start()));
        debug!("Calendar query {} returned {} appointment(s)", query.window, appointments.len());
        appointments
    }

    /// The same result grouped by start date, the shape schedule
    /// rendering consumes.
    pub async fn calendar_by_day(&self, query: &CalendarQuery) -> BTreeMap<NaiveDate, Vec<Appointment>> {
        let mut grouped: BTreeMap<NaiveDate, Vec<Appointment>> = BTreeMap::new();
        for appointment in self.calendar(query).await {
            grouped.entry(appointment.window.start().date_naive()).or_default().push(appointment);
        }
        grouped
    }
}
