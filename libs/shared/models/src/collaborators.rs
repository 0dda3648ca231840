// libs/shared/models/src/collaborators.rs
//
// Seams to the two external collaborators the scheduling core consumes:
// the provider/client directory (existence checks only) and the reminder
// sink the conflict resolver notifies after every committed change.
use async_trait::async_trait;
use std::collections::HashSet;
use uuid::Uuid;

use crate::time::TimeRange;

/// Identity lookup owned by the surrounding record system. Scheduling
/// performs only an existence check and otherwise trusts the ids it is
/// given.
#[async_trait]
pub trait DirectoryLookup: Send + Sync {
    async fn provider_exists(&self, provider_id: Uuid) -> bool;
    async fn client_exists(&self, client_id: Uuid) -> bool;
}

/// Directory that accepts every id, for hosts that validate upstream.
pub struct OpenDirectory;

#[async_trait]
impl DirectoryLookup for OpenDirectory {
    async fn provider_exists(&self, _provider_id: Uuid) -> bool {
        true
    }

    async fn client_exists(&self, _client_id: Uuid) -> bool {
        true
    }
}

/// Fixed roster directory. Useful for small deployments and tests.
#[derive(Debug, Default)]
pub struct StaticDirectory {
    providers: HashSet<Uuid>,
    clients: HashSet<Uuid>,
}

impl StaticDirectory {
    pub fn new(providers: impl IntoIterator<Item = Uuid>, clients: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            providers: providers.into_iter().collect(),
            clients: clients.into_iter().collect(),
        }
    }
}

#[async_trait]
impl DirectoryLookup for StaticDirectory {
    async fn provider_exists(&self, provider_id: Uuid) -> bool {
        self.providers.contains(&provider_id)
    }

    async fn client_exists(&self, client_id: Uuid) -> bool {
        self.clients.contains(&client_id)
    }
}

/// Receives a notification after every committed appointment change so
/// derived reminder state can be regenerated. `active` is false once the
/// appointment has reached a terminal status.
#[async_trait]
pub trait ReminderSink: Send + Sync {
    async fn appointment_changed(&self, appointment_id: Uuid, window: TimeRange, active: bool);
}

/// Sink that drops every notification, for hosts without reminders.
pub struct NullReminderSink;

#[async_trait]
impl ReminderSink for NullReminderSink {
    async fn appointment_changed(&self, _appointment_id: Uuid, _window: TimeRange, _active: bool) {}
}
