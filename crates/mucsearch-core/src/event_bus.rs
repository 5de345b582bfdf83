//! Event bus - fan-out of query notifications to async consumers
//!
//! `EventBus` is itself a `QueryListener`. Attach one bus to any number of
//! queries and every `EventReceiver` sees their notifications in delivery
//! order:
//!
//! ```ignore
//! let bus = Arc::new(EventBus::from_config(&config));
//! let mut receiver = bus.subscribe();
//! query.add_listener(bus.clone());
//!
//! while let Some(event) = receiver.recv().await { ... }
//! ```
//!
//! A receiver that falls more than `event_bus_capacity` notifications behind
//! loses the oldest ones. `EventReceiver::skipped` tells it so; the query's
//! `results()` snapshot is the way to resynchronize.

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{trace, warn};

use crate::config::QueryConfig;
use crate::domain::{QueryEvent, QueryListener};

pub struct EventBus {
    sender: broadcast::Sender<QueryEvent>,
}

impl EventBus {
    /// Bus sized by `config.event_bus_capacity`
    pub fn from_config(config: &QueryConfig) -> Self {
        Self::with_capacity(config.event_bus_capacity)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// New receiver; sees notifications published after this call
    pub fn subscribe(&self) -> EventReceiver {
        EventReceiver {
            receiver: self.sender.subscribe(),
            skipped: 0,
        }
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::from_config(&QueryConfig::default())
    }
}

impl QueryListener for EventBus {
    fn on_query_event(&self, event: &QueryEvent) {
        // Err only means nobody is listening right now
        if self.sender.send(event.clone()).is_err() {
            trace!(
                query_id = %event.query_id(),
                event_type = event.type_name(),
                "[EventBus] No receivers"
            );
        }
    }
}

pub struct EventReceiver {
    receiver: broadcast::Receiver<QueryEvent>,
    skipped: u64,
}

impl EventReceiver {
    /// Next notification; `None` once the bus is dropped
    pub async fn recv(&mut self) -> Option<QueryEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(count)) => self.record_lag(count),
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Next notification if one is already queued
    pub fn try_recv(&mut self) -> Option<QueryEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(count)) => self.record_lag(count),
                Err(TryRecvError::Empty | TryRecvError::Closed) => return None,
            }
        }
    }

    /// Notifications lost to lag since this receiver was created
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    fn record_lag(&mut self, count: u64) {
        self.skipped += count;
        warn!(
            skipped = count,
            total_skipped = self.skipped,
            "[EventBus] Receiver lagged, results may be stale"
        );
    }
}
