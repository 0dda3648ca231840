// libs/availability-cell/src/models.rs
use chrono::{NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use shared_models::TimeRange;

/// One bookable-time declaration for a provider. A provider's resolved
/// availability is the union of all rule instances minus blackout
/// exceptions; rules are allowed to overlap each other in definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityRule {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub kind: RuleKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Weekly pattern: the given weekday between two local times, active
    /// within a validity window (open-ended when `effective_until` is
    /// unset). Times are interpreted in the clinic's canonical zone
    /// (UTC internally).
    Recurring {
        weekday: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
        effective_from: NaiveDate,
        effective_until: Option<NaiveDate>,
    },
    /// A single concrete window.
    OneOff(TimeRange),
}

/// Per-provider exception to the rule set, maintained by the admin
/// preferences collaborator. The scheduling core only reads these.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityException {
    pub id: Uuid,
    pub provider_id: Uuid,
    pub window: TimeRange,
    pub kind: ExceptionKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionKind {
    /// Removes the window from availability (vacation, meetings).
    Blackout,
    /// Grants one-off availability outside the recurring pattern
    /// (covering a colleague). Additive: unions with existing rules.
    Add,
}
