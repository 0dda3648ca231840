use std::env;
use tracing::warn;

/// Tunables for the scheduling core, loaded from the environment by the
/// hosting service. Every field has a working default so the core can run
/// in tests without any environment at all.
#[derive(Debug, Clone)]
pub struct SchedulingConfig {
    /// How long a booking waits on the per-provider lock before giving up.
    pub booking_lock_timeout_ms: u64,
    /// Grace period during which a start time slightly in the past is
    /// still accepted (front-desk booking of "right now" appointments).
    pub past_booking_leniency_minutes: i64,
    /// Hard cap on how many occurrences one recurrence rule may expand to.
    pub max_series_occurrences: u32,
    /// Lead time for the email reminder, in hours before the start.
    pub reminder_email_lead_hours: i64,
    /// Lead time for the SMS reminder, in minutes before the start.
    pub reminder_sms_lead_minutes: i64,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            booking_lock_timeout_ms: 5_000,
            past_booking_leniency_minutes: 0,
            max_series_occurrences: 52,
            reminder_email_lead_hours: 24,
            reminder_sms_lead_minutes: 60,
        }
    }
}

impl SchedulingConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            booking_lock_timeout_ms: parse_var(
                "WELLSPRING_BOOKING_LOCK_TIMEOUT_MS",
                defaults.booking_lock_timeout_ms,
            ),
            past_booking_leniency_minutes: parse_var(
                "WELLSPRING_PAST_BOOKING_LENIENCY_MINUTES",
                defaults.past_booking_leniency_minutes,
            ),
            max_series_occurrences: parse_var(
                "WELLSPRING_MAX_SERIES_OCCURRENCES",
                defaults.max_series_occurrences,
            ),
            reminder_email_lead_hours: parse_var(
                "WELLSPRING_REMINDER_EMAIL_LEAD_HOURS",
                defaults.reminder_email_lead_hours,
            ),
            reminder_sms_lead_minutes: parse_var(
                "WELLSPRING_REMINDER_SMS_LEAD_MINUTES",
                defaults.reminder_sms_lead_minutes,
            ),
        }
    }
}

fn parse_var<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has unparseable value {:?}, using default {}", name, raw, default);
            default
        }),
        Err(_) => default,
    }
}
