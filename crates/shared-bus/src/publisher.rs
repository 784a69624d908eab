//! # Event Publisher
//!
//! The dispatcher publishes through [`EventPublisher`]; the node owns one
//! [`InMemoryEventBus`] and hands out subscriptions from it.

use crate::events::{EventFilter, NodeEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, trace};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event, returning how many subscriptions will see it
    /// before filtering.
    async fn publish(&self, event: NodeEvent) -> usize;

    fn events_published(&self) -> u64;
}

/// Broadcast-backed bus. Every subscription gets every event; filters are
/// applied on the receiving side.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<NodeEvent>,
    published: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            published: AtomicU64::new(0),
            capacity,
        }
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(topics = ?filter.topics, "Subscribing to accepted documents");
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Live subscriptions, whatever their filter.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: NodeEvent) -> usize {
        let name = event.name();
        self.published.fetch_add(1, Ordering::Relaxed);

        if let Ok(receivers) = self.sender.send(event) {
            debug!(event = name, receivers, "Event published");
            receivers
        } else {
            // Propagation disabled or already shut down.
            trace!(event = name, "No subscriber for event");
            0
        }
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
