//! ChatRoomQuery - live search over chat rooms
//!
//! Lifecycle:
//! - `run()` performs the initial scan once, then moves Running -> Completed
//! - subscribers (`add_listener`) keep the query attached to upstream sources;
//!   the first subscriber attaches, removing the last one detaches
//! - `cancel()` detaches unconditionally and moves to Canceled
//!
//! Locking: status, subscriber count, upstream attachments and the result
//! set share one mutex. Handlers decide and mutate under it, then release it
//! before notifying subscribers.

mod handlers;
mod lifecycle;

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};
use uuid::Uuid;

use mucsearch_core::{
    Matcher, ProviderRegistry, QueryConfig, QueryError, QueryEvent, QueryListener, QueryResult,
    QueryStatus, ResultEntry, ResultSet, RoomDirectory, SubscriptionId,
};

use lifecycle::{Attachments, UpstreamListener};

/// Mutable query state, always accessed under `ChatRoomQuery::state`
#[derive(Default)]
struct QueryState {
    status: QueryStatus,
    /// `run()` has been called
    started: bool,
    subscribers: usize,
    results: ResultSet,
    /// Bumped by every room-list or provider event this query applies; a
    /// directory snapshot taken across a bump is stale
    directory_epoch: u64,
    /// Present exactly while attached to upstream sources
    attachments: Option<Attachments>,
}

pub struct ChatRoomQuery {
    id: Uuid,
    matcher: Matcher,
    directory: Arc<dyn RoomDirectory>,
    registry: Arc<dyn ProviderRegistry>,
    state: Mutex<QueryState>,
    listeners: RwLock<Vec<(SubscriptionId, Arc<dyn QueryListener>)>>,
    weak_self: Weak<ChatRoomQuery>,
}

impl ChatRoomQuery {
    /// Create a query; nothing is scanned or attached until `run()` /
    /// `add_listener()`.
    pub fn new(
        query_string: impl Into<String>,
        directory: Arc<dyn RoomDirectory>,
        registry: Arc<dyn ProviderRegistry>,
        config: &QueryConfig,
    ) -> Arc<Self> {
        let matcher = Matcher::new(query_string, config.match_mode);
        Arc::new_cyclic(|weak_self| Self {
            id: Uuid::new_v4(),
            matcher,
            directory,
            registry,
            state: Mutex::new(QueryState::default()),
            listeners: RwLock::new(Vec::new()),
            weak_self: weak_self.clone(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn query_string(&self) -> &str {
        self.matcher.query()
    }

    pub fn status(&self) -> QueryStatus {
        self.state.lock().status
    }

    pub fn subscriber_count(&self) -> usize {
        self.state.lock().subscribers
    }

    /// Whether upstream listeners are currently registered
    pub fn is_attached(&self) -> bool {
        self.state.lock().attachments.is_some()
    }

    /// Number of providers whose presence channel is currently subscribed
    pub fn presence_subscriptions(&self) -> usize {
        self.state
            .lock()
            .attachments
            .as_ref()
            .map_or(0, Attachments::presence_count)
    }

    /// Snapshot of the current results in order
    pub fn results(&self) -> Vec<ResultEntry> {
        self.state.lock().results.snapshot()
    }

    pub fn result_count(&self) -> usize {
        self.state.lock().results.len()
    }

    pub fn find(&self, address: &str) -> Option<ResultEntry> {
        self.state.lock().results.find(address).cloned()
    }

    /// Position of `entry` in the current result order.
    ///
    /// Only meaningful for this instant: concurrent changes can shift
    /// positions between two calls.
    pub fn index_of(&self, entry: &ResultEntry) -> Option<usize> {
        self.state.lock().results.index_of(entry)
    }

    // ========================================================================
    // Query driver
    // ========================================================================

    /// Initial scan: every room of every provider goes through the matcher;
    /// each match is reported as found. Completes the query unless it was
    /// canceled meanwhile.
    pub fn run(&self) -> QueryResult<()> {
        {
            let mut state = self.state.lock();
            if state.started {
                return Err(QueryError::AlreadyStarted { query_id: self.id });
            }
            state.started = true;
            if state.status == QueryStatus::Canceled {
                debug!(query_id = %self.id, "[ChatRoomQuery] Canceled before scan, skipping");
                return Ok(());
            }
        }

        info!(
            query_id = %self.id,
            query = %self.query_string(),
            "[ChatRoomQuery] Starting initial scan"
        );

        for provider in self.directory.providers() {
            if self.status() == QueryStatus::Canceled {
                info!(query_id = %self.id, "[ChatRoomQuery] Canceled during scan");
                break;
            }
            let events = self.scan_provider(&provider);
            self.notify(events);
        }

        let found = {
            let mut state = self.state.lock();
            if state.status != QueryStatus::Running {
                return Ok(());
            }
            state.status = QueryStatus::Completed;
            state.results.len()
        };

        info!(
            query_id = %self.id,
            results = found,
            "[ChatRoomQuery] Initial scan completed"
        );
        self.notify(vec![self.status_event(QueryStatus::Completed)]);
        Ok(())
    }

    /// Run the initial scan on tokio's blocking pool
    pub fn start(self: &Arc<Self>) -> JoinHandle<QueryResult<()>> {
        let query = Arc::clone(self);
        tokio::task::spawn_blocking(move || query.run())
    }

    /// Stop the query: release every upstream subscription and move to
    /// Canceled. Idempotent. Results already gathered are kept.
    pub fn cancel(&self) {
        let previous = {
            let mut state = self.state.lock();
            self.detach(&mut state);
            std::mem::replace(&mut state.status, QueryStatus::Canceled)
        };

        if previous != QueryStatus::Canceled {
            info!(
                query_id = %self.id,
                previous = %previous,
                "[ChatRoomQuery] Canceled"
            );
            self.notify(vec![self.status_event(QueryStatus::Canceled)]);
        }
    }

    /// Move the query to `status`.
    ///
    /// `Canceled` behaves like `cancel()`. `Completed` is only reachable from
    /// `Running`; nothing goes back to `Running`.
    pub fn set_status(&self, status: QueryStatus) -> QueryResult<()> {
        if status == QueryStatus::Canceled {
            self.cancel();
            return Ok(());
        }

        {
            let mut state = self.state.lock();
            let current = state.status;
            match (current, status) {
                (QueryStatus::Running, QueryStatus::Running)
                | (QueryStatus::Completed, QueryStatus::Completed) => return Ok(()),
                (QueryStatus::Running, QueryStatus::Completed) => {
                    state.status = QueryStatus::Completed;
                }
                (from, to) => return Err(QueryError::InvalidTransition { from, to }),
            }
        }

        self.notify(vec![self.status_event(status)]);
        Ok(())
    }

    // ========================================================================
    // Subscribers
    // ========================================================================

    /// Subscribe to result notifications. The first subscriber attaches the
    /// query to its upstream sources.
    pub fn add_listener(&self, listener: Arc<dyn QueryListener>) -> SubscriptionId {
        let id = SubscriptionId::next();
        let mut state = self.state.lock();
        self.listeners.write().push((id, listener));
        state.subscribers += 1;

        debug!(
            query_id = %self.id,
            subscribers = state.subscribers,
            "[ChatRoomQuery] Listener added"
        );

        if state.subscribers == 1 {
            if state.status == QueryStatus::Canceled {
                debug!(query_id = %self.id, "[ChatRoomQuery] Canceled, not attaching");
            } else {
                self.attach(&mut state);
            }
        }
        id
    }

    /// Unsubscribe. Removing the last subscriber detaches from upstream.
    ///
    /// Returns `false` if `id` is not a current subscription.
    pub fn remove_listener(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        {
            let mut listeners = self.listeners.write();
            let Some(position) = listeners.iter().position(|(sub, _)| *sub == id) else {
                return false;
            };
            listeners.remove(position);
        }

        debug_assert!(state.subscribers > 0, "subscriber count underflow");
        state.subscribers = state.subscribers.saturating_sub(1);

        debug!(
            query_id = %self.id,
            subscribers = state.subscribers,
            "[ChatRoomQuery] Listener removed"
        );

        if state.subscribers == 0 {
            self.detach(&mut state);
        }
        true
    }

    fn attach(&self, state: &mut QueryState) {
        if state.attachments.is_some() {
            error!(query_id = %self.id, "[ChatRoomQuery] Already attached to upstream sources");
            debug_assert!(false, "query attached twice");
            return;
        }

        let listener = Arc::new(UpstreamListener::new(self.weak_self.clone()));
        let attachments = Attachments::attach(&*self.directory, &*self.registry, listener);
        info!(
            query_id = %self.id,
            presence_channels = attachments.presence_count(),
            "[ChatRoomQuery] Attached to upstream sources"
        );
        state.attachments = Some(attachments);
    }

    fn detach(&self, state: &mut QueryState) {
        if let Some(attachments) = state.attachments.take() {
            attachments.detach(&*self.directory, &*self.registry);
            info!(query_id = %self.id, "[ChatRoomQuery] Detached from upstream sources");
        }
    }

    /// Deliver events to a snapshot of the subscribers. Never called with
    /// the state lock held.
    fn notify(&self, events: Vec<QueryEvent>) {
        if events.is_empty() {
            return;
        }

        let listeners: Vec<Arc<dyn QueryListener>> = self
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for event in &events {
            for listener in &listeners {
                listener.on_query_event(event);
            }
        }
    }

    fn status_event(&self, status: QueryStatus) -> QueryEvent {
        QueryEvent::StatusChanged {
            query_id: self.id,
            status,
        }
    }
}

impl Drop for ChatRoomQuery {
    fn drop(&mut self) {
        if let Some(attachments) = self.state.get_mut().attachments.take() {
            attachments.detach(&*self.directory, &*self.registry);
        }
    }
}
