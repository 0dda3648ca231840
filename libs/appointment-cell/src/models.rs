// libs/appointment-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use shared_models::{SchedulingError, TimeRange};

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked block of provider time. Appointments are never deleted;
/// cancellation is a status so the audit history survives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub client_id: Uuid,
    pub window: TimeRange,
    pub service_line: ServiceLine,
    pub modality: Modality,
    pub status: AppointmentStatus,
    /// Groups the instances of one recurring series; `None` for a
    /// standalone appointment. Preserved across reschedules.
    pub recurrence_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub last_modified_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    /// Statuses that count toward the per-provider overlap invariant.
    pub fn blocks_slot(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::Confirmed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            AppointmentStatus::Completed | AppointmentStatus::Cancelled | AppointmentStatus::NoShow
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
        }
    }
}

/// Program the appointment bills under. Opaque to scheduling beyond
/// grouping and calendar filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceLine {
    Outpatient,
    Peer,
    Waads,
    Dahs,
}

impl fmt::Display for ServiceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceLine::Outpatient => write!(f, "outpatient"),
            ServiceLine::Peer => write!(f, "peer"),
            ServiceLine::Waads => write!(f, "waads"),
            ServiceLine::Dahs => write!(f, "dahs"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    InPerson,
    Telehealth,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingRequest {
    pub provider_id: Uuid,
    pub client_id: Uuid,
    pub window: TimeRange,
    pub service_line: ServiceLine,
    pub modality: Modality,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesBookingRequest {
    pub provider_id: Uuid,
    pub client_id: Uuid,
    pub service_line: ServiceLine,
    pub modality: Modality,
    pub rule: RecurrenceRule,
}

// ==============================================================================
// RECURRENCE MODELS
// ==============================================================================

/// Weekly generation rule for a recurring series. Expansion is always a
/// bounded, finite sequence (capped by configuration).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceRule {
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// First date on or after which occurrences are generated.
    pub starts_on: NaiveDate,
    pub end: RecurrenceEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceEnd {
    Count(u32),
    Until(NaiveDate),
}

/// The materialized membership of one recurring series. Exists so that
/// series-wide cancel/reschedule can fan out to member appointments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecurrenceSeries {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub client_id: Uuid,
    pub rule: RecurrenceRule,
    pub appointment_ids: Vec<Uuid>,
}

// ==============================================================================
// SERIES OPERATION RESULTS
// ==============================================================================

/// Structured partial result of a series operation. Member operations
/// already committed are never rolled back; failures are reported here
/// instead of collapsing into one opaque error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesOutcome {
    pub series_id: Uuid,
    pub succeeded: Vec<Uuid>,
    pub failed: Vec<SeriesFailure>,
    /// True when a caller-supplied deadline stopped the fan-out before
    /// every member was visited.
    pub stopped_early: bool,
}

impl SeriesOutcome {
    pub fn new(series_id: Uuid) -> Self {
        Self { series_id, succeeded: Vec::new(), failed: Vec::new(), stopped_early: false }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesFailure {
    /// `None` when the failure happened before an appointment existed
    /// (an occurrence that could not be booked).
    pub appointment_id: Option<Uuid>,
    pub window: TimeRange,
    pub error: SchedulingError,
}

// ==============================================================================
// CALENDAR QUERY MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarQuery {
    pub window: TimeRange,
    pub provider_id: Option<Uuid>,
    pub service_line: Option<ServiceLine>,
}

impl CalendarQuery {
    pub fn range(window: TimeRange) -> Self {
        Self { window, provider_id: None, service_line: None }
    }

    pub fn for_provider(window: TimeRange, provider_id: Uuid) -> Self {
        Self { window, provider_id: Some(provider_id), service_line: None }
    }
}
