//! Broadcast-style fan-out of domain events to live subscribers.
//!
//! Each subscriber gets its own bounded flume channel. Publishing uses
//! `try_send`: a subscriber whose queue is full or whose receiver has been
//! dropped is pruned on the spot, so a slow or vanished subscriber can
//! never block a publisher. Per-subscriber delivery order matches publish
//! order; there is no cross-subscriber ordering guarantee.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tiller_core::types::{Run, Task};
use tracing::debug;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// DomainEvent
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
#[serde(rename_all = "snake_case")]
pub enum DomainEvent {
    TaskCreated(Task),
    TaskUpdated(Task),
    RunCreated(Run),
    RunTransitioned(Run),
    HistoryAppended {
        id: Uuid,
        target: String,
        mode: String,
        created_at: DateTime<Utc>,
    },
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// A cancellable subscription handle. Dropping it (or the receiver inside)
/// is the unsubscribe: the bus prunes the dead sender on the next publish.
pub struct Subscription {
    rx: flume::Receiver<Arc<DomainEvent>>,
}

impl Subscription {
    /// Blocking-style receive for synchronous tests.
    pub fn recv(&self) -> Result<Arc<DomainEvent>, flume::RecvError> {
        self.rx.recv()
    }

    pub async fn recv_async(&self) -> Result<Arc<DomainEvent>, flume::RecvError> {
        self.rx.recv_async().await
    }

    pub fn try_recv(&self) -> Result<Arc<DomainEvent>, flume::TryRecvError> {
        self.rx.try_recv()
    }

    /// Consume the handle, exposing the underlying receiver (for stream
    /// adapters at the transport layer).
    pub fn into_receiver(self) -> flume::Receiver<Arc<DomainEvent>> {
        self.rx
    }
}

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Vec<flume::Sender<Arc<DomainEvent>>>>>,
    capacity: usize,
}

impl EventBus {
    /// `capacity` is the per-subscriber queue bound.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
            capacity,
        }
    }

    /// Register a new subscriber. It receives every event published from
    /// this point forward, in publish order.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = flume::bounded(self.capacity);
        let mut senders = self.inner.lock().expect("event bus lock poisoned");
        senders.push(tx);
        Subscription { rx }
    }

    /// Fan an event out to all live subscribers. Never blocks on subscriber
    /// consumption speed: full or disconnected subscribers are dropped.
    pub fn publish(&self, event: DomainEvent) {
        let event = Arc::new(event);
        let mut senders = self.inner.lock().expect("event bus lock poisoned");
        let before = senders.len();
        senders.retain(|tx| tx.try_send(event.clone()).is_ok());
        let dropped = before - senders.len();
        if dropped > 0 {
            debug!(dropped, "pruned slow or disconnected event subscribers");
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().expect("event bus lock poisoned").len()
    }
}
