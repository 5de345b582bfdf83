//! Upstream attachment bookkeeping
//!
//! `Attachments` records every subscription taken when a query attaches, so
//! detaching releases exactly those and nothing else. `UpstreamListener` is
//! the single object registered with all upstream sources; it holds the
//! query weakly and forwards each event category to its handler.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use tracing::{debug, trace, warn};

use mucsearch_core::{
    ChatProvider, PresenceChangeEvent, PresenceChannel, PresenceListener, ProviderChangeEvent,
    ProviderId, ProviderListener, ProviderRegistry, RegistrationEvent, RegistrationListener,
    RoomDirectory, RoomListChangeEvent, RoomListListener, SubscriptionId,
};

use super::ChatRoomQuery;

pub(crate) struct UpstreamListener {
    query: Weak<ChatRoomQuery>,
}

impl UpstreamListener {
    pub(crate) fn new(query: Weak<ChatRoomQuery>) -> Self {
        Self { query }
    }

    fn with_query(&self, f: impl FnOnce(&ChatRoomQuery)) {
        match self.query.upgrade() {
            Some(query) => f(&query),
            None => trace!("[ChatRoomQuery] Event for dropped query ignored"),
        }
    }
}

impl PresenceListener for UpstreamListener {
    fn presence_changed(&self, event: &PresenceChangeEvent) {
        self.with_query(|query| query.handle_presence(event));
    }
}

impl RoomListListener for UpstreamListener {
    fn room_list_changed(&self, event: &RoomListChangeEvent) {
        self.with_query(|query| query.handle_room_list(event));
    }
}

impl ProviderListener for UpstreamListener {
    fn provider_changed(&self, event: &ProviderChangeEvent) {
        self.with_query(|query| query.handle_provider(event));
    }
}

impl RegistrationListener for UpstreamListener {
    fn registration_changed(&self, event: &RegistrationEvent) {
        self.with_query(|query| query.handle_registration(event));
    }
}

struct PresenceSubscription {
    channel: Arc<dyn PresenceChannel>,
    id: SubscriptionId,
}

/// Subscriptions held while a query is attached
pub(crate) struct Attachments {
    listener: Arc<UpstreamListener>,
    presence: HashMap<ProviderId, PresenceSubscription>,
    room_list: SubscriptionId,
    providers: SubscriptionId,
    registration: SubscriptionId,
}

impl Attachments {
    /// Subscribe once to each upstream source: presence of every registered
    /// provider, room list, provider list and provider registration.
    pub(crate) fn attach(
        directory: &dyn RoomDirectory,
        registry: &dyn ProviderRegistry,
        listener: Arc<UpstreamListener>,
    ) -> Self {
        let room_list = directory.subscribe_room_list(listener.clone());
        let providers = directory.subscribe_providers(listener.clone());
        let registration = registry.subscribe(listener.clone());

        let mut attachments = Self {
            listener,
            presence: HashMap::new(),
            room_list,
            providers,
            registration,
        };
        for provider in registry.chat_providers() {
            attachments.attach_presence(&provider);
        }
        attachments
    }

    /// Subscribe to `provider`'s presence channel.
    ///
    /// Returns `false` when already subscribed or when the provider has no
    /// presence channel.
    pub(crate) fn attach_presence(&mut self, provider: &Arc<dyn ChatProvider>) -> bool {
        let provider_id = provider.id();
        if self.presence.contains_key(provider_id) {
            warn!(
                provider = %provider_id,
                "[ChatRoomQuery] Presence channel already subscribed, skipping"
            );
            return false;
        }

        let Some(channel) = provider.presence_channel() else {
            debug!(
                provider = %provider_id,
                "[ChatRoomQuery] Provider has no presence channel"
            );
            return false;
        };

        let id = channel.subscribe(self.listener.clone());
        self.presence
            .insert(provider_id.clone(), PresenceSubscription { channel, id });
        true
    }

    /// Unsubscribe from `provider`'s presence channel, if subscribed
    pub(crate) fn detach_presence(&mut self, provider: &ProviderId) -> bool {
        match self.presence.remove(provider) {
            Some(subscription) => {
                subscription.channel.unsubscribe(subscription.id);
                true
            }
            None => false,
        }
    }

    pub(crate) fn presence_count(&self) -> usize {
        self.presence.len()
    }

    /// Release everything `attach` and `attach_presence` acquired
    pub(crate) fn detach(mut self, directory: &dyn RoomDirectory, registry: &dyn ProviderRegistry) {
        for (_, subscription) in self.presence.drain() {
            subscription.channel.unsubscribe(subscription.id);
        }
        directory.unsubscribe_room_list(self.room_list);
        directory.unsubscribe_providers(self.providers);
        registry.unsubscribe(self.registration);
    }
}
