// libs/reminder-cell/src/services/scheduler.rs
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_config::SchedulingConfig;
use shared_models::{ReminderSink, TimeRange};

use crate::models::{ReminderChannel, ReminderEvent};

/// Keeps the derived reminder events for every live appointment and
/// exposes the due set to the notification collaborator. Delivery itself
/// happens outside the core; this service only derives fire times.
pub struct ReminderScheduler {
    email_lead: Duration,
    sms_lead: Duration,
    events: RwLock<HashMap<Uuid, Vec<ReminderEvent>>>,
}

impl ReminderScheduler {
    pub fn new(config: &SchedulingConfig) -> Self {
        Self {
            email_lead: Duration::hours(config.reminder_email_lead_hours),
            sms_lead: Duration::minutes(config.reminder_sms_lead_minutes),
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Events due at or before `as_of`, soonest first. Non-destructive;
    /// use [`drain_due`](Self::drain_due) to consume them.
    pub async fn pending_reminders(&self, as_of: DateTime<Utc>) -> Vec<ReminderEvent> {
        let events = self.events.read().await;
        let mut due: Vec<ReminderEvent> = events
            .values()
            .flatten()
            .filter(|event| event.fire_at <= as_of)
            .cloned()
            .collect();
        due.sort_by_key(|event| event.fire_at);
        due
    }

    /// Remove and return everything due at or before `as_of`, for the
    /// notification collaborator to deliver.
    pub async fn drain_due(&self, as_of: DateTime<Utc>) -> Vec<ReminderEvent> {
        let mut events = self.events.write().await;
        let mut due = Vec::new();
        for appointment_events in events.values_mut() {
            let (fire, keep): (Vec<_>, Vec<_>) =
                appointment_events.drain(..).partition(|event| event.fire_at <= as_of);
            due.extend(fire);
            *appointment_events = keep;
        }
        events.retain(|_, remaining| !remaining.is_empty());
        due.sort_by_key(|event| event.fire_at);
        due
    }
}

#[async_trait]
impl ReminderSink for ReminderScheduler {
    async fn appointment_changed(&self, appointment_id: Uuid, window: TimeRange, active: bool) {
        let mut events = self.events.write().await;
        if !active {
            if events.remove(&appointment_id).is_some() {
                debug!("Invalidated reminders for appointment {}", appointment_id);
            }
            return;
        }

        let derived = vec![
            ReminderEvent {
                appointment_id,
                fire_at: window.start() - self.email_lead,
                channel: ReminderChannel::Email,
            },
            ReminderEvent {
                appointment_id,
                fire_at: window.start() - self.sms_lead,
                channel: ReminderChannel::Sms,
            },
        ];
        debug!("Derived {} reminder(s) for appointment {}", derived.len(), appointment_id);
        events.insert(appointment_id, derived);
    }
}
