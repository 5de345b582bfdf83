//! ResultEntry - one chat room matched by a query

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use super::{ProviderId, RoomInfo};

/// Local user's presence in a matched room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    /// The local user is in the room
    Online,
    /// Not joined - this is the default
    #[default]
    Offline,
}

impl PresenceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Offline => "offline",
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online)
    }
}

/// A matched chat room.
///
/// Identity is the `address` alone: two entries with the same address are
/// equal whatever their presence, auto-join flag or provider. Entries order
/// lexicographically by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEntry {
    /// Room canonical name, unique within a result set
    pub address: String,

    /// Secondary room identifier
    pub identifier: String,

    /// Provider that hosts the room
    pub provider: ProviderId,

    /// Local user's presence in the room
    pub presence: PresenceStatus,

    /// Room auto-join flag
    pub auto_join: bool,
}

impl ResultEntry {
    pub fn new(
        address: impl Into<String>,
        identifier: impl Into<String>,
        provider: ProviderId,
    ) -> Self {
        Self {
            address: address.into(),
            identifier: identifier.into(),
            provider,
            presence: PresenceStatus::default(),
            auto_join: false,
        }
    }

    /// Build an entry from a directory room
    pub fn from_room(provider: ProviderId, room: &RoomInfo) -> Self {
        Self::new(room.name.clone(), room.identifier.clone(), provider)
            .with_auto_join(room.auto_join)
    }

    pub fn with_presence(mut self, presence: PresenceStatus) -> Self {
        self.presence = presence;
        self
    }

    pub fn with_auto_join(mut self, auto_join: bool) -> Self {
        self.auto_join = auto_join;
        self
    }

    /// Name shown to users; rooms are displayed by their canonical name
    pub fn display_name(&self) -> &str {
        &self.address
    }

    /// True when every field (not just the address) matches `other`
    pub fn same_state(&self, other: &ResultEntry) -> bool {
        self.address == other.address
            && self.identifier == other.identifier
            && self.provider == other.provider
            && self.presence == other.presence
            && self.auto_join == other.auto_join
    }
}

impl PartialEq for ResultEntry {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for ResultEntry {}

impl Hash for ResultEntry {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state);
    }
}

impl Ord for ResultEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.address.cmp(&other.address)
    }
}

impl PartialOrd for ResultEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
