// libs/reminder-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A derived reminder fire time. Never authoritative: regenerated from
/// the owning appointment on every committed change and dropped once the
/// appointment reaches a terminal status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderEvent {
    pub appointment_id: Uuid,
    pub fire_at: DateTime<Utc>,
    pub channel: ReminderChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderChannel {
    Email,
    Sms,
}
