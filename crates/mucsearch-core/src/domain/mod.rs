//! Domain entities, value objects, and events
//!
//! - Entities (RoomInfo, ResultEntry)
//! - Value Objects (ProviderId, PresenceStatus, QueryStatus, SubscriptionId)
//! - Inbound upstream events and the outbound QueryEvent enum

mod entry;
mod event;
mod room;

pub use entry::{PresenceStatus, ResultEntry};
pub use event::{
    PresenceChange, PresenceChangeEvent, ProviderChange, ProviderChangeEvent, QueryEvent,
    QueryListener, QueryStatus, RegistrationChange, RegistrationEvent, RoomListChange,
    RoomListChangeEvent,
};
pub use room::{ProviderId, RoomInfo, SubscriptionId};
