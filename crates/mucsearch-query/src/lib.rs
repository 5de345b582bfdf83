//! mucsearch query engine
//!
//! A `ChatRoomQuery` scans every provider's rooms once, then keeps its
//! result set live by listening to presence, room-list, provider-list and
//! provider-registration events for as long as it has subscribers.
//! `ChatRoomSource` owns the upstream collaborators and hands out queries.

pub mod query;
pub mod source;

pub use query::ChatRoomQuery;
pub use source::{ChatRoomSource, SourceType};
