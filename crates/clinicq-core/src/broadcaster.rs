//! Fan-out of queue updates to connected displays.
//!
//! Each subscriber gets its own bounded [`mpsc`] buffer. Publishing uses
//! `try_send` only, so one slow display can never stall the others or the
//! scheduler. A subscriber whose buffer is full is dropped: its sender is
//! removed, its receiver drains what was buffered and then ends, and the
//! WebSocket handler closes the connection.

use std::collections::BTreeMap;
use std::sync::Arc;

use clinicq_types::BroadcastMessage;
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Default per-subscriber buffer, in messages.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 16;

/// Identifies one subscription for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriberId(Uuid);

impl SubscriberId {
    fn generate() -> Self {
        Self(Uuid::now_v7())
    }
}

impl core::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The receiving half handed to one display connection.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: mpsc::Receiver<Arc<BroadcastMessage>>,
}

impl Subscription {
    /// This subscription's id, for [`Broadcaster::unsubscribe`].
    pub const fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next message. Returns `None` once the broadcaster has
    /// dropped this subscriber and the buffer is drained.
    pub async fn recv(&mut self) -> Option<Arc<BroadcastMessage>> {
        self.receiver.recv().await
    }
}

/// Outcome of one [`Broadcaster::publish`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Subscribers the message was queued for.
    pub delivered: usize,
    /// Subscribers removed because their buffer was full.
    pub dropped: Vec<SubscriberId>,
    /// Subscribers removed because their receiver was already gone.
    pub closed: Vec<SubscriberId>,
}

/// Set of live display subscriptions.
#[derive(Debug)]
pub struct Broadcaster {
    subscribers: Mutex<BTreeMap<SubscriberId, mpsc::Sender<Arc<BroadcastMessage>>>>,
    buffer: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_SUBSCRIBER_BUFFER)
    }
}

impl Broadcaster {
    /// Create a broadcaster whose subscribers buffer up to `buffer`
    /// messages (at least one).
    pub fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(BTreeMap::new()),
            buffer: buffer.max(1),
        }
    }

    /// Register a new subscriber.
    pub async fn subscribe(&self) -> Subscription {
        let (sender, receiver) = mpsc::channel(self.buffer);
        let id = SubscriberId::generate();
        let mut subscribers = self.subscribers.lock().await;
        subscribers.insert(id, sender);
        debug!(subscriber = %id, total = subscribers.len(), "Display subscribed");
        Subscription { id, receiver }
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock().await;
        let removed = subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber = %id, total = subscribers.len(), "Display unsubscribed");
        }
        removed
    }

    /// Number of live subscribers.
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    /// Queue `message` for every subscriber without waiting on any of them.
    pub async fn publish(&self, message: BroadcastMessage) -> PublishReport {
        let message = Arc::new(message);
        let mut report = PublishReport::default();
        let mut subscribers = self.subscribers.lock().await;

        for (id, sender) in subscribers.iter() {
            match sender.try_send(Arc::clone(&message)) {
                Ok(()) => report.delivered = report.delivered.saturating_add(1),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(subscriber = %id, buffer = self.buffer, "Display too slow; dropping");
                    report.dropped.push(*id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(subscriber = %id, "Display receiver closed; removing");
                    report.closed.push(*id);
                }
            }
        }
        for id in report.dropped.iter().chain(&report.closed) {
            subscribers.remove(id);
        }
        report
    }
}
