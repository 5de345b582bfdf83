//! Upstream event handlers
//!
//! Each handler decides and mutates under the query's state lock, collects
//! the resulting notifications, and emits them once the lock is released.

use tracing::{debug, trace};

use mucsearch_core::{
    PresenceChangeEvent, PresenceStatus, ProviderChange, ProviderChangeEvent, ProviderId,
    QueryEvent, QueryStatus, RegistrationChange, RegistrationEvent, ResultEntry, ResultSet,
    RoomInfo, RoomListChange, RoomListChangeEvent,
};

use super::ChatRoomQuery;

/// Outcome of applying a presence status to an existing entry
enum PresenceOutcome {
    /// No entry with that address
    Missing,
    /// Entry already had that presence
    Unchanged,
    Changed(QueryEvent),
}

impl ChatRoomQuery {
    pub(crate) fn handle_presence(&self, event: &PresenceChangeEvent) {
        let presence = if event.change.is_join() {
            PresenceStatus::Online
        } else {
            PresenceStatus::Offline
        };

        let outcome = {
            let mut state = self.state.lock();
            if state.status == QueryStatus::Canceled {
                trace!(query_id = %self.id, "[ChatRoomQuery] Presence event after cancel ignored");
                return;
            }
            self.apply_presence(&mut state.results, &event.room_name, presence)
        };

        match outcome {
            PresenceOutcome::Changed(changed) => {
                debug!(
                    query_id = %self.id,
                    room = %event.room_name,
                    change = ?event.change,
                    "[ChatRoomQuery] Presence changed"
                );
                self.notify(vec![changed]);
            }
            PresenceOutcome::Unchanged => {
                trace!(room = %event.room_name, "[ChatRoomQuery] Presence unchanged");
            }
            PresenceOutcome::Missing if event.change.is_join() => self.add_joined_room(event),
            PresenceOutcome::Missing => {
                trace!(room = %event.room_name, "[ChatRoomQuery] Presence for non-result room");
            }
        }
    }

    /// Joined a room that is not (yet) a result: add it if it matches
    fn add_joined_room(&self, event: &PresenceChangeEvent) {
        if !self.matcher.matches(&event.room_name, &event.room_identifier) {
            return;
        }

        let auto_join = match self.directory.find_room(&event.provider, &event.room_name) {
            Some(room) => room.auto_join,
            None => {
                debug!(
                    provider = %event.provider,
                    room = %event.room_name,
                    "[ChatRoomQuery] Joined room unknown to directory"
                );
                false
            }
        };

        let events = {
            let mut state = self.state.lock();
            if state.status == QueryStatus::Canceled {
                return;
            }
            // Re-check: the room may have been added while the lock was released
            let outcome =
                self.apply_presence(&mut state.results, &event.room_name, PresenceStatus::Online);
            match outcome {
                PresenceOutcome::Changed(changed) => vec![changed],
                PresenceOutcome::Unchanged => Vec::new(),
                PresenceOutcome::Missing => {
                    let entry = ResultEntry::new(
                        event.room_name.clone(),
                        event.room_identifier.clone(),
                        event.provider.clone(),
                    )
                    .with_presence(PresenceStatus::Online)
                    .with_auto_join(auto_join);
                    state.results.upsert(entry.clone());
                    vec![self.found_event(entry)]
                }
            }
        };

        self.notify(events);
    }

    pub(crate) fn handle_room_list(&self, event: &RoomListChangeEvent) {
        let room = &event.room;

        if event.change == RoomListChange::Added
            && !self.matcher.matches(&room.name, &room.identifier)
        {
            trace!(room = %room.name, "[ChatRoomQuery] Added room does not match");
            return;
        }

        let events: Vec<QueryEvent> = {
            let mut state = self.state.lock();
            if state.status == QueryStatus::Canceled {
                trace!(query_id = %self.id, "[ChatRoomQuery] Room event after cancel ignored");
                return;
            }
            state.directory_epoch += 1;

            let events = match event.change {
                RoomListChange::Added => self
                    .merge_room(&mut state.results, &event.provider, room)
                    .into_iter()
                    .collect(),
                RoomListChange::Removed => state
                    .results
                    .remove(&room.name)
                    .map(|entry| self.removed_event(entry))
                    .into_iter()
                    .collect(),
                RoomListChange::Changed => {
                    match state.results.find(&room.name) {
                        Some(existing) if existing.auto_join != room.auto_join => {
                            let updated = existing.clone().with_auto_join(room.auto_join);
                            state.results.upsert(updated.clone());
                            vec![self.changed_event(updated)]
                        }
                        _ => Vec::new(),
                    }
                }
            };
            events
        };

        debug!(
            query_id = %self.id,
            room = %room.name,
            change = ?event.change,
            notifications = events.len(),
            "[ChatRoomQuery] Room list changed"
        );
        self.notify(events);
    }

    pub(crate) fn handle_provider(&self, event: &ProviderChangeEvent) {
        let events: Vec<QueryEvent> = match event.change {
            ProviderChange::Added => {
                self.state.lock().directory_epoch += 1;
                self.scan_provider(&event.provider)
            }
            ProviderChange::Removed => {
                let mut state = self.state.lock();
                if state.status == QueryStatus::Canceled {
                    return;
                }
                state.directory_epoch += 1;
                let removed = state
                    .results
                    .remove_where(|entry| entry.provider == event.provider);
                removed
                    .into_iter()
                    .map(|entry| self.removed_event(entry))
                    .collect()
            }
        };

        debug!(
            query_id = %self.id,
            provider = %event.provider,
            change = ?event.change,
            notifications = events.len(),
            "[ChatRoomQuery] Provider changed"
        );
        self.notify(events);
    }

    pub(crate) fn handle_registration(&self, event: &RegistrationEvent) {
        let provider_id = event.provider.id();
        if event.owner_stopping {
            debug!(
                provider = %provider_id,
                "[ChatRoomQuery] Provider owner stopping, registration event ignored"
            );
            return;
        }

        let mut state = self.state.lock();
        let Some(attachments) = state.attachments.as_mut() else {
            trace!(provider = %provider_id, "[ChatRoomQuery] Not attached, registration ignored");
            return;
        };

        let applied = match event.change {
            RegistrationChange::Registered => attachments.attach_presence(&event.provider),
            RegistrationChange::Unregistering => attachments.detach_presence(provider_id),
        };

        debug!(
            query_id = %self.id,
            provider = %provider_id,
            change = ?event.change,
            applied,
            "[ChatRoomQuery] Provider registration changed"
        );
    }

    /// Apply the room-added rule to every room `provider` currently has.
    ///
    /// The directory is read without the state lock. If a room-list or
    /// provider event was applied meanwhile, the snapshot may still hold a
    /// room that event removed, so it is thrown away and read again.
    pub(super) fn scan_provider(&self, provider: &ProviderId) -> Vec<QueryEvent> {
        loop {
            let epoch = {
                let state = self.state.lock();
                if state.status == QueryStatus::Canceled {
                    return Vec::new();
                }
                state.directory_epoch
            };

            let rooms = self.directory.rooms(provider);

            let mut state = self.state.lock();
            if state.status == QueryStatus::Canceled {
                return Vec::new();
            }
            if state.directory_epoch != epoch {
                trace!(
                    query_id = %self.id,
                    provider = %provider,
                    "[ChatRoomQuery] Directory changed during scan, reading again"
                );
                continue;
            }

            let events: Vec<QueryEvent> = rooms
                .iter()
                .filter(|room| self.matcher.matches(&room.name, &room.identifier))
                .filter_map(|room| self.merge_room(&mut state.results, provider, room))
                .collect();
            return events;
        }
    }

    /// Insert a matching room. An existing entry for the same address keeps
    /// its presence and is only reported when something else changed.
    fn merge_room(
        &self,
        results: &mut ResultSet,
        provider: &ProviderId,
        room: &RoomInfo,
    ) -> Option<QueryEvent> {
        let mut entry = ResultEntry::from_room(provider.clone(), room);
        match results.find(&room.name) {
            Some(existing) => {
                entry.presence = existing.presence;
                if existing.same_state(&entry) {
                    return None;
                }
                results.upsert(entry.clone());
                Some(self.changed_event(entry))
            }
            None => {
                results.upsert(entry.clone());
                Some(self.found_event(entry))
            }
        }
    }

    fn apply_presence(
        &self,
        results: &mut ResultSet,
        address: &str,
        presence: PresenceStatus,
    ) -> PresenceOutcome {
        let Some(existing) = results.find(address) else {
            return PresenceOutcome::Missing;
        };
        if existing.presence == presence {
            return PresenceOutcome::Unchanged;
        }

        let updated = existing.clone().with_presence(presence);
        results.upsert(updated.clone());
        PresenceOutcome::Changed(self.changed_event(updated))
    }

    fn found_event(&self, entry: ResultEntry) -> QueryEvent {
        QueryEvent::ResultFound {
            query_id: self.id,
            entry,
        }
    }

    fn changed_event(&self, entry: ResultEntry) -> QueryEvent {
        QueryEvent::ResultChanged {
            query_id: self.id,
            entry,
        }
    }

    fn removed_event(&self, entry: ResultEntry) -> QueryEvent {
        QueryEvent::ResultRemoved {
            query_id: self.id,
            entry,
        }
    }
}
