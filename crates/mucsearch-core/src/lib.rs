//! # mucsearch Core Library
//!
//! Domain types and building blocks for live chat-room search queries.
//!
//! ## Modules
//!
//! - `domain` - Rooms, providers, result entries, inbound and outbound events
//! - `directory` - Upstream collaborator traits (room directory, presence, registry)
//! - `matcher` - Query string matching rule
//! - `result_set` - Ordered, deduplicated result container
//! - `event_bus` - Fan-out of query notifications to async consumers
//! - `config` - Query configuration
//! - `error` - Error types

pub mod config;
pub mod directory;
pub mod domain;
pub mod error;
pub mod event_bus;
pub mod matcher;
pub mod result_set;

// Re-export commonly used types
pub use domain::*;
pub use directory::*;

pub use config::{MatchMode, QueryConfig};
pub use error::{QueryError, QueryResult};
pub use event_bus::{EventBus, EventReceiver};
pub use matcher::Matcher;
pub use result_set::ResultSet;
