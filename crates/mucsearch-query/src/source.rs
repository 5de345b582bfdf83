//! ChatRoomSource - contact source that creates chat room queries
//!
//! Owns the upstream collaborators and the query configuration, and keeps
//! track of the queries it created so they can all be torn down together.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, info};

use mucsearch_core::{ProviderRegistry, QueryConfig, QueryStatus, RoomDirectory};

use crate::query::ChatRoomQuery;

/// Category a contact source belongs to in a search UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// Contributes to the contact list
    ContactList,
}

pub struct ChatRoomSource {
    directory: Arc<dyn RoomDirectory>,
    registry: Arc<dyn ProviderRegistry>,
    config: QueryConfig,
    queries: Mutex<Vec<Weak<ChatRoomQuery>>>,
}

impl ChatRoomSource {
    pub fn new(
        directory: Arc<dyn RoomDirectory>,
        registry: Arc<dyn ProviderRegistry>,
        config: QueryConfig,
    ) -> Self {
        Self {
            directory,
            registry,
            config,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn display_name(&self) -> &str {
        &self.config.source_display_name
    }

    pub fn source_type(&self) -> SourceType {
        SourceType::ContactList
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Create a query for `query_string`. The caller subscribes to it and
    /// starts it.
    pub fn create_query(&self, query_string: impl Into<String>) -> Arc<ChatRoomQuery> {
        let query = ChatRoomQuery::new(
            query_string,
            Arc::clone(&self.directory),
            Arc::clone(&self.registry),
            &self.config,
        );

        let mut queries = self.queries.lock();
        queries.retain(|weak| weak.strong_count() > 0);
        queries.push(Arc::downgrade(&query));

        debug!(
            query_id = %query.id(),
            query = %query.query_string(),
            tracked = queries.len(),
            "[ChatRoomSource] Created query"
        );
        query
    }

    /// Queries still alive and not canceled
    pub fn active_queries(&self) -> Vec<Arc<ChatRoomQuery>> {
        self.queries
            .lock()
            .iter()
            .filter_map(Weak::upgrade)
            .filter(|query| query.status() != QueryStatus::Canceled)
            .collect()
    }

    /// Cancel every live query created by this source
    pub fn cancel_all(&self) {
        let queries: Vec<Arc<ChatRoomQuery>> = {
            let mut tracked = self.queries.lock();
            let alive = tracked.iter().filter_map(Weak::upgrade).collect();
            tracked.clear();
            alive
        };

        info!(count = queries.len(), "[ChatRoomSource] Canceling all queries");
        for query in queries {
            query.cancel();
        }
    }
}
