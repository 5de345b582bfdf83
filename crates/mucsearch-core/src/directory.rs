//! Upstream collaborator traits
//!
//! These traits define what a query consumes without specifying the
//! implementation (a live chat client, an in-memory mock, etc.)
//!
//! Implementations may deliver events from any thread, but must not hold
//! their own internal locks while invoking a listener: a query reacts to
//! events by calling back into its collaborators (room lookups, presence
//! subscriptions).

use std::sync::Arc;

use crate::domain::{
    PresenceChangeEvent, ProviderChangeEvent, ProviderId, RegistrationEvent, RoomInfo,
    RoomListChangeEvent, SubscriptionId,
};

// ============================================================================
// Listener traits
// ============================================================================

/// Receives local-user presence changes for rooms of one provider
pub trait PresenceListener: Send + Sync {
    fn presence_changed(&self, event: &PresenceChangeEvent);
}

/// Receives room added/removed/changed notifications from the directory
pub trait RoomListListener: Send + Sync {
    fn room_list_changed(&self, event: &RoomListChangeEvent);
}

/// Receives provider added/removed notifications from the directory
pub trait ProviderListener: Send + Sync {
    fn provider_changed(&self, event: &ProviderChangeEvent);
}

/// Receives provider service registration changes
pub trait RegistrationListener: Send + Sync {
    fn registration_changed(&self, event: &RegistrationEvent);
}

// ============================================================================
// Collaborators
// ============================================================================

/// Per-provider channel of local-user presence events
pub trait PresenceChannel: Send + Sync {
    /// Start delivering presence events to `listener`
    fn subscribe(&self, listener: Arc<dyn PresenceListener>) -> SubscriptionId;

    /// Stop delivering to a previous subscription
    ///
    /// Returns `false` if the id was unknown.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// A provider service (account/connection)
pub trait ChatProvider: Send + Sync {
    fn id(&self) -> &ProviderId;

    /// Presence channel, if the provider supports multi-user chat
    fn presence_channel(&self) -> Option<Arc<dyn PresenceChannel>>;
}

/// Directory of providers and the rooms known under each of them
pub trait RoomDirectory: Send + Sync {
    /// All providers currently known to the directory
    fn providers(&self) -> Vec<ProviderId>;

    /// Rooms currently known under `provider` (empty if the provider is unknown)
    fn rooms(&self, provider: &ProviderId) -> Vec<RoomInfo>;

    /// Look up one room by name
    fn find_room(&self, provider: &ProviderId, name: &str) -> Option<RoomInfo> {
        self.rooms(provider).into_iter().find(|room| room.name == name)
    }

    fn subscribe_room_list(&self, listener: Arc<dyn RoomListListener>) -> SubscriptionId;

    fn unsubscribe_room_list(&self, id: SubscriptionId) -> bool;

    fn subscribe_providers(&self, listener: Arc<dyn ProviderListener>) -> SubscriptionId;

    fn unsubscribe_providers(&self, id: SubscriptionId) -> bool;
}

/// Registry of provider services
pub trait ProviderRegistry: Send + Sync {
    /// Provider services currently registered
    fn chat_providers(&self) -> Vec<Arc<dyn ChatProvider>>;

    fn subscribe(&self, listener: Arc<dyn RegistrationListener>) -> SubscriptionId;

    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}
