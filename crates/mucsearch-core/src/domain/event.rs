//! Query Events - inbound upstream events and outbound result notifications
//!
//! Inbound events are delivered by the upstream collaborators (presence
//! channels, the room directory, the provider registry). Outbound events are
//! emitted by a query to its subscribers.
//!
//! # Design Principles
//!
//! - **One handler per inbound category**: presence, room list, provider list, registration
//! - **One notification per affected entry**: found, changed or removed
//! - **Serializable**: outbound events can be carried over the event bus or logged

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProviderId, ResultEntry, RoomInfo};
use crate::directory::ChatProvider;

// ============================================================================
// QUERY STATUS
// ============================================================================

/// Lifecycle state of a query.
///
/// Monotonic: once `Completed` or `Canceled` a query never returns to `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    /// Created or scanning
    #[default]
    Running,
    /// Initial scan finished; live updates continue while subscribed
    Completed,
    /// Stopped; all upstream subscriptions released
    Canceled,
}

impl QueryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Canceled)
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// INBOUND: PRESENCE
// ============================================================================

/// Kind of local-user presence change in a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceChange {
    Joined,
    Left,
    Kicked,
    Dropped,
}

impl PresenceChange {
    /// Whether the local user is in the room after this change
    pub fn is_join(&self) -> bool {
        matches!(self, Self::Joined)
    }
}

/// Local user joined/left/was kicked from/dropped out of a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceChangeEvent {
    pub provider: ProviderId,
    pub room_name: String,
    pub room_identifier: String,
    pub change: PresenceChange,
}

impl PresenceChangeEvent {
    pub fn new(
        provider: ProviderId,
        room_name: impl Into<String>,
        room_identifier: impl Into<String>,
        change: PresenceChange,
    ) -> Self {
        Self {
            provider,
            room_name: room_name.into(),
            room_identifier: room_identifier.into(),
            change,
        }
    }
}

// ============================================================================
// INBOUND: ROOM LIST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomListChange {
    Added,
    Removed,
    /// Room settings changed (auto-join toggled)
    Changed,
}

/// A room was added to, removed from or changed in the directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListChangeEvent {
    pub provider: ProviderId,
    pub room: RoomInfo,
    pub change: RoomListChange,
}

impl RoomListChangeEvent {
    pub fn new(provider: ProviderId, room: RoomInfo, change: RoomListChange) -> Self {
        Self {
            provider,
            room,
            change,
        }
    }
}

// ============================================================================
// INBOUND: PROVIDER LIST
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderChange {
    Added,
    Removed,
}

/// A provider appeared in or disappeared from the room directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderChangeEvent {
    pub provider: ProviderId,
    pub change: ProviderChange,
}

impl ProviderChangeEvent {
    pub fn added(provider: ProviderId) -> Self {
        Self {
            provider,
            change: ProviderChange::Added,
        }
    }

    pub fn removed(provider: ProviderId) -> Self {
        Self {
            provider,
            change: ProviderChange::Removed,
        }
    }
}

// ============================================================================
// INBOUND: PROVIDER SERVICE REGISTRATION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationChange {
    Registered,
    Unregistering,
}

/// A provider service was registered or is about to be unregistered
#[derive(Clone)]
pub struct RegistrationEvent {
    pub provider: Arc<dyn ChatProvider>,
    pub change: RegistrationChange,
    /// The runtime unit owning the service is shutting down
    pub owner_stopping: bool,
}

impl RegistrationEvent {
    pub fn registered(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            change: RegistrationChange::Registered,
            owner_stopping: false,
        }
    }

    pub fn unregistering(provider: Arc<dyn ChatProvider>) -> Self {
        Self {
            provider,
            change: RegistrationChange::Unregistering,
            owner_stopping: false,
        }
    }

    pub fn with_owner_stopping(mut self, stopping: bool) -> Self {
        self.owner_stopping = stopping;
        self
    }
}

impl fmt::Debug for RegistrationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationEvent")
            .field("provider", self.provider.id())
            .field("change", &self.change)
            .field("owner_stopping", &self.owner_stopping)
            .finish()
    }
}

// ============================================================================
// OUTBOUND: QUERY EVENTS
// ============================================================================

/// Notifications a query emits to its subscribers
///
/// Events serialize with a `type` field containing the snake_case variant name:
/// ```json
/// { "type": "result_found", "query_id": "...", "entry": { "address": "..." } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryEvent {
    /// A room newly matches the query
    ResultFound { query_id: Uuid, entry: ResultEntry },

    /// A matched room's presence or auto-join state changed
    ResultChanged { query_id: Uuid, entry: ResultEntry },

    /// A room no longer matches (removed, or its provider went away)
    ResultRemoved { query_id: Uuid, entry: ResultEntry },

    /// The query moved to a new lifecycle state
    StatusChanged { query_id: Uuid, status: QueryStatus },
}

impl QueryEvent {
    /// Get the event type name (for logging/debugging)
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::ResultFound { .. } => "result_found",
            Self::ResultChanged { .. } => "result_changed",
            Self::ResultRemoved { .. } => "result_removed",
            Self::StatusChanged { .. } => "status_changed",
        }
    }

    pub fn query_id(&self) -> Uuid {
        match self {
            Self::ResultFound { query_id, .. }
            | Self::ResultChanged { query_id, .. }
            | Self::ResultRemoved { query_id, .. }
            | Self::StatusChanged { query_id, .. } => *query_id,
        }
    }

    /// The affected entry, if this is a result notification
    pub fn entry(&self) -> Option<&ResultEntry> {
        match self {
            Self::ResultFound { entry, .. }
            | Self::ResultChanged { entry, .. }
            | Self::ResultRemoved { entry, .. } => Some(entry),
            Self::StatusChanged { .. } => None,
        }
    }
}

/// Subscriber to a query's outbound events
///
/// Called on whichever thread applied the change, after the query has
/// released its internal lock, so implementations may query the engine.
pub trait QueryListener: Send + Sync {
    fn on_query_event(&self, event: &QueryEvent);
}
