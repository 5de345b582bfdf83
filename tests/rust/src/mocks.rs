//! Mock upstream collaborators for testing
//!
//! In-memory implementations of every upstream trait. Each one counts
//! subscribe/unsubscribe calls so lifecycle tests can assert exact pairing,
//! and fires events to a snapshot of its listeners (never under its own lock).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use mucsearch_core::{
    ChatProvider, PresenceChange, PresenceChangeEvent, PresenceChannel, PresenceListener,
    ProviderChangeEvent, ProviderId, ProviderListener, ProviderRegistry, RegistrationEvent,
    RegistrationListener, RoomDirectory, RoomInfo, RoomListChange, RoomListChangeEvent,
    RoomListListener, SubscriptionId,
};

// ============================================================================
// ListenerList
// ============================================================================

/// Subscriptions of one listener type plus call counters
pub struct ListenerList<L: ?Sized> {
    entries: RwLock<Vec<(SubscriptionId, Arc<L>)>>,
    subscribes: AtomicUsize,
    unsubscribes: AtomicUsize,
}

impl<L: ?Sized> Default for ListenerList<L> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            subscribes: AtomicUsize::new(0),
            unsubscribes: AtomicUsize::new(0),
        }
    }
}

impl<L: ?Sized> ListenerList<L> {
    fn add(&self, listener: Arc<L>) -> SubscriptionId {
        let id = SubscriptionId::next();
        self.entries.write().push((id, listener));
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        id
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        self.unsubscribes.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.write();
        match entries.iter().position(|(sub, _)| *sub == id) {
            Some(position) => {
                entries.remove(position);
                true
            }
            None => false,
        }
    }

    fn snapshot(&self) -> Vec<Arc<L>> {
        self.entries.read().iter().map(|(_, l)| Arc::clone(l)).collect()
    }

    /// Currently registered listeners
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn subscribe_calls(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub fn unsubscribe_calls(&self) -> usize {
        self.unsubscribes.load(Ordering::SeqCst)
    }
}

// ============================================================================
// MockPresenceChannel
// ============================================================================

#[derive(Default)]
pub struct MockPresenceChannel {
    pub listeners: ListenerList<dyn PresenceListener>,
}

impl MockPresenceChannel {
    pub fn fire(&self, event: PresenceChangeEvent) {
        for listener in self.listeners.snapshot() {
            listener.presence_changed(&event);
        }
    }
}

impl PresenceChannel for MockPresenceChannel {
    fn subscribe(&self, listener: Arc<dyn PresenceListener>) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }
}

// ============================================================================
// MockChatProvider
// ============================================================================

pub struct MockChatProvider {
    id: ProviderId,
    channel: Option<Arc<MockPresenceChannel>>,
}

impl MockChatProvider {
    /// Provider with a presence channel
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ProviderId::new(id),
            channel: Some(Arc::new(MockPresenceChannel::default())),
        })
    }

    /// Provider without multi-user chat support
    pub fn without_presence(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: ProviderId::new(id),
            channel: None,
        })
    }

    /// The presence channel; panics for providers created `without_presence`
    pub fn channel(&self) -> &Arc<MockPresenceChannel> {
        self.channel.as_ref().expect("provider has no presence channel")
    }

    /// Fire a presence change for `room` on this provider's channel
    pub fn presence(&self, room: &str, identifier: &str, change: PresenceChange) {
        self.channel().fire(PresenceChangeEvent::new(
            self.id.clone(),
            room,
            identifier,
            change,
        ));
    }
}

impl ChatProvider for MockChatProvider {
    fn id(&self) -> &ProviderId {
        &self.id
    }

    fn presence_channel(&self) -> Option<Arc<dyn PresenceChannel>> {
        self.channel
            .as_ref()
            .map(|channel| Arc::clone(channel) as Arc<dyn PresenceChannel>)
    }
}

// ============================================================================
// MockRoomDirectory
// ============================================================================

type ReadHook = Box<dyn FnOnce(&MockRoomDirectory) + Send>;

#[derive(Default)]
pub struct MockRoomDirectory {
    rooms: RwLock<BTreeMap<ProviderId, Vec<RoomInfo>>>,
    after_read: Mutex<Option<ReadHook>>,
    pub room_listeners: ListenerList<dyn RoomListListener>,
    pub provider_listeners: ListenerList<dyn ProviderListener>,
}

impl MockRoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(self, provider: &str, rooms: Vec<RoomInfo>) -> Self {
        self.rooms.write().insert(ProviderId::new(provider), rooms);
        self
    }

    /// Run `hook` once, right after the next `rooms()` snapshot is taken and
    /// before it is returned
    pub fn after_next_read(&self, hook: impl FnOnce(&MockRoomDirectory) + Send + 'static) {
        *self.after_read.lock() = Some(Box::new(hook));
    }

    /// Add a room and notify room-list listeners
    pub fn add_room(&self, provider: &str, room: RoomInfo) {
        let provider = ProviderId::new(provider);
        self.rooms
            .write()
            .entry(provider.clone())
            .or_default()
            .push(room.clone());
        self.fire_room(RoomListChangeEvent::new(provider, room, RoomListChange::Added));
    }

    /// Remove a room and notify room-list listeners
    pub fn remove_room(&self, provider: &str, name: &str) {
        let provider = ProviderId::new(provider);
        let removed = {
            let mut rooms = self.rooms.write();
            let list = rooms.entry(provider.clone()).or_default();
            list.iter()
                .position(|room| room.name == name)
                .map(|position| list.remove(position))
        };
        let room = removed.unwrap_or_else(|| RoomInfo::new(name, name));
        self.fire_room(RoomListChangeEvent::new(provider, room, RoomListChange::Removed));
    }

    /// Toggle a room's auto-join flag and notify room-list listeners
    pub fn set_auto_join(&self, provider: &str, name: &str, auto_join: bool) {
        let provider = ProviderId::new(provider);
        let updated = {
            let mut rooms = self.rooms.write();
            rooms
                .entry(provider.clone())
                .or_default()
                .iter_mut()
                .find(|room| room.name == name)
                .map(|room| {
                    room.auto_join = auto_join;
                    room.clone()
                })
        };
        let room = updated.unwrap_or_else(|| RoomInfo::new(name, name).with_auto_join(auto_join));
        self.fire_room(RoomListChangeEvent::new(provider, room, RoomListChange::Changed));
    }

    /// Add a provider with its rooms and notify provider listeners
    pub fn add_provider(&self, provider: &str, rooms: Vec<RoomInfo>) {
        let provider = ProviderId::new(provider);
        self.rooms.write().insert(provider.clone(), rooms);
        self.fire_provider(ProviderChangeEvent::added(provider));
    }

    /// Remove a provider and notify provider listeners
    pub fn remove_provider(&self, provider: &str) {
        let provider = ProviderId::new(provider);
        self.rooms.write().remove(&provider);
        self.fire_provider(ProviderChangeEvent::removed(provider));
    }

    pub fn fire_room(&self, event: RoomListChangeEvent) {
        for listener in self.room_listeners.snapshot() {
            listener.room_list_changed(&event);
        }
    }

    pub fn fire_provider(&self, event: ProviderChangeEvent) {
        for listener in self.provider_listeners.snapshot() {
            listener.provider_changed(&event);
        }
    }
}

impl RoomDirectory for MockRoomDirectory {
    fn providers(&self) -> Vec<ProviderId> {
        self.rooms.read().keys().cloned().collect()
    }

    fn rooms(&self, provider: &ProviderId) -> Vec<RoomInfo> {
        let rooms = self.rooms.read().get(provider).cloned().unwrap_or_default();
        let hook = self.after_read.lock().take();
        if let Some(hook) = hook {
            hook(self);
        }
        rooms
    }

    fn subscribe_room_list(&self, listener: Arc<dyn RoomListListener>) -> SubscriptionId {
        self.room_listeners.add(listener)
    }

    fn unsubscribe_room_list(&self, id: SubscriptionId) -> bool {
        self.room_listeners.remove(id)
    }

    fn subscribe_providers(&self, listener: Arc<dyn ProviderListener>) -> SubscriptionId {
        self.provider_listeners.add(listener)
    }

    fn unsubscribe_providers(&self, id: SubscriptionId) -> bool {
        self.provider_listeners.remove(id)
    }
}

// ============================================================================
// MockProviderRegistry
// ============================================================================

#[derive(Default)]
pub struct MockProviderRegistry {
    providers: RwLock<Vec<Arc<MockChatProvider>>>,
    pub listeners: ListenerList<dyn RegistrationListener>,
}

impl MockProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(self, provider: Arc<MockChatProvider>) -> Self {
        self.providers.write().push(provider);
        self
    }

    /// Register a provider service and notify listeners
    pub fn register(&self, provider: Arc<MockChatProvider>) {
        self.providers.write().push(Arc::clone(&provider));
        self.fire(RegistrationEvent::registered(provider));
    }

    /// Notify listeners that a provider service is going away, then drop it
    pub fn unregister(&self, provider: &Arc<MockChatProvider>, owner_stopping: bool) {
        self.fire(
            RegistrationEvent::unregistering(Arc::clone(provider) as Arc<dyn ChatProvider>)
                .with_owner_stopping(owner_stopping),
        );
        self.providers
            .write()
            .retain(|p| !Arc::ptr_eq(p, provider));
    }

    pub fn fire(&self, event: RegistrationEvent) {
        for listener in self.listeners.snapshot() {
            listener.registration_changed(&event);
        }
    }
}

impl ProviderRegistry for MockProviderRegistry {
    fn chat_providers(&self) -> Vec<Arc<dyn ChatProvider>> {
        self.providers
            .read()
            .iter()
            .map(|provider| Arc::clone(provider) as Arc<dyn ChatProvider>)
            .collect()
    }

    fn subscribe(&self, listener: Arc<dyn RegistrationListener>) -> SubscriptionId {
        self.listeners.add(listener)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.remove(id)
    }
}
