//! # Event Bus Adapter
//!
//! In-memory implementation of [`EventSink`].
//!
//! Uses `tokio::sync::broadcast` for multi-consumer delivery. Events
//! published while nobody is subscribed are dropped.

use crate::config::DEFAULT_EVENT_CAPACITY;
use crate::domain::entities::RegistryEvent;
use crate::errors::EventBusError;
use crate::ports::outbound::EventSink;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Broadcast event bus for registry observers.
#[derive(Debug)]
pub struct InMemoryEventBus {
    sender: broadcast::Sender<RegistryEvent>,
    events_published: AtomicU64,
}

impl InMemoryEventBus {
    /// Create a bus with default capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    /// Create a bus buffering up to `capacity` events per subscriber.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            events_published: AtomicU64::new(0),
        }
    }

    /// Subscribe to every event.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.sender.subscribe()
    }

    /// Subscribe to the events of a single topic.
    #[must_use]
    pub fn subscribe_topic(&self, topic: &'static str) -> TopicSubscription {
        TopicSubscription {
            receiver: self.sender.subscribe(),
            topic,
        }
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventSink for InMemoryEventBus {
    async fn publish(&self, event: RegistryEvent) -> Result<usize, EventBusError> {
        let topic = event.topic();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(topic, receivers, "Event published");
                Ok(receivers)
            }
            Err(_) => {
                warn!(topic, "Event dropped (no receivers)");
                Err(EventBusError::NoSubscribers(topic))
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }
}

/// Receiver filtered to one topic.
#[derive(Debug)]
pub struct TopicSubscription {
    receiver: broadcast::Receiver<RegistryEvent>,
    topic: &'static str,
}

impl TopicSubscription {
    /// Next event on this topic; None once the bus is gone.
    ///
    /// Lagged receivers skip the lost events and keep going.
    pub async fn recv(&mut self) -> Option<RegistryEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.topic() == self.topic => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(topic = self.topic, skipped, "Subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Topic this subscription filters on.
    #[must_use]
    pub fn topic(&self) -> &'static str {
        self.topic
    }
}
