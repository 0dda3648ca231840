// libs/availability-cell/src/services/schedule.rs
use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use shared_models::time::union;
use shared_models::{SchedulingError, TimeRange};

use crate::models::{AvailabilityException, AvailabilityRule, ExceptionKind, RuleKind};

/// Owns the availability rules and exceptions for every provider and
/// answers `resolve_available` queries. Rule writes come from provider
/// setup flows; exceptions are ingested from the admin preferences feed
/// (snapshot replace or single-change apply) and only read here.
pub struct AvailabilityService {
    rules: RwLock<HashMap<Uuid, Vec<AvailabilityRule>>>,
    exceptions: RwLock<HashMap<Uuid, Vec<AvailabilityException>>>,
}

impl AvailabilityService {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            exceptions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_rule(&self, rule: AvailabilityRule) -> Result<(), SchedulingError> {
        if let RuleKind::Recurring { start_time, end_time, effective_from, effective_until, .. } = &rule.kind {
            if start_time >= end_time {
                return Err(SchedulingError::InvalidRange(format!(
                    "recurring rule start {} must be before end {}",
                    start_time, end_time
                )));
            }
            if let Some(until) = effective_until {
                if until < effective_from {
                    return Err(SchedulingError::InvalidRange(format!(
                        "rule validity ends {} before it begins {}",
                        until, effective_from
                    )));
                }
            }
        }

        debug!("Adding availability rule {} for provider {}", rule.id, rule.provider_id);
        self.rules.write().await.entry(rule.provider_id).or_default().push(rule);
        Ok(())
    }

    pub async fn remove_rule(&self, provider_id: Uuid, rule_id: Uuid) -> Result<(), SchedulingError> {
        let mut rules = self.rules.write().await;
        let provider_rules = rules.get_mut(&provider_id).ok_or(SchedulingError::NotFound(rule_id))?;
        let before = provider_rules.len();
        provider_rules.retain(|r| r.id != rule_id);
        if provider_rules.len() == before {
            return Err(SchedulingError::NotFound(rule_id));
        }
        Ok(())
    }

    /// Replace a provider's exception set with a fresh snapshot from the
    /// admin feed.
    pub async fn replace_exceptions(&self, provider_id: Uuid, snapshot: Vec<AvailabilityException>) {
        debug!("Replacing {} exception(s) for provider {}", snapshot.len(), provider_id);
        self.exceptions.write().await.insert(provider_id, snapshot);
    }

    /// Apply one exception from the admin change stream.
    pub async fn apply_exception(&self, exception: AvailabilityException) {
        self.exceptions.write().await.entry(exception.provider_id).or_default().push(exception);
    }

    pub async fn remove_exception(&self, provider_id: Uuid, exception_id: Uuid) -> Result<(), SchedulingError> {
        let mut exceptions = self.exceptions.write().await;
        let provider_exceptions =
            exceptions.get_mut(&provider_id).ok_or(SchedulingError::NotFound(exception_id))?;
        let before = provider_exceptions.len();
        provider_exceptions.retain(|e| e.id != exception_id);
        if provider_exceptions.len() == before {
            return Err(SchedulingError::NotFound(exception_id));
        }
        Ok(())
    }

    /// Resolve the provider's bookable time within `window` to a minimal
    /// sorted sequence of non-overlapping ranges: union of every rule
    /// instance and `Add` exception, minus every `Blackout` exception.
    /// Deterministic in the rule/exception set; insertion order and the
    /// order the feed delivered exceptions never affect the result.
    pub async fn resolve_available(&self, provider_id: Uuid, window: TimeRange) -> Vec<TimeRange> {
        let rules = self.rules.read().await;
        let exceptions = self.exceptions.read().await;

        let mut granted: Vec<TimeRange> = Vec::new();

        for rule in rules.get(&provider_id).map(Vec::as_slice).unwrap_or_default() {
            match &rule.kind {
                RuleKind::Recurring { .. } => {
                    granted.extend(expand_recurring(rule, window));
                }
                RuleKind::OneOff(range) => {
                    if let Some(clipped) = range.intersect(&window) {
                        granted.push(clipped);
                    }
                }
            }
        }

        let provider_exceptions = exceptions.get(&provider_id).map(Vec::as_slice).unwrap_or_default();

        for exception in provider_exceptions {
            if exception.kind == ExceptionKind::Add {
                if let Some(clipped) = exception.window.intersect(&window) {
                    granted.push(clipped);
                }
            }
        }

        let mut available = union(&granted);

        for exception in provider_exceptions {
            if exception.kind == ExceptionKind::Blackout {
                available = available
                    .iter()
                    .flat_map(|range| range.subtract(&exception.window))
                    .collect();
            }
        }

        debug!(
            "Resolved {} available range(s) for provider {} in {}",
            available.len(),
            provider_id,
            window
        );
        available
    }
}

impl Default for AvailabilityService {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand one recurring rule into the concrete instances intersecting
/// `window`. Bounded by the query window, never an open-ended stream.
fn expand_recurring(rule: &AvailabilityRule, window: TimeRange) -> Vec<TimeRange> {
    let RuleKind::Recurring { weekday, start_time, end_time, effective_from, effective_until } = &rule.kind
    else {
        return Vec::new();
    };

    let first_day: NaiveDate = window.start().date_naive();
    let last_day: NaiveDate = window.end().date_naive();

    let mut instances = Vec::new();
    for day in first_day.iter_days().take_while(|d| *d <= last_day) {
        if day.weekday() != *weekday {
            continue;
        }
        if day < *effective_from || effective_until.is_some_and(|until| day > until) {
            continue;
        }

        // Rule creation guarantees start_time < end_time.
        let Ok(instance) = TimeRange::new(day.and_time(*start_time).and_utc(), day.and_time(*end_time).and_utc())
        else {
            continue;
        };
        if let Some(clipped) = instance.intersect(&window) {
            instances.push(clipped);
        }
    }
    instances
}
