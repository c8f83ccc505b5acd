//! # Event bus for queue events.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. The coordinator, every supervisor and
//! the lifecycle calls publish into it; the queue's listener task fans events out
//! to subscribers, and callers may take their own receiver via
//! [`WorkQueue::subscribe`](crate::WorkQueue::subscribe).
//!
//! ```text
//! insert() ───────┐
//! Supervisor #1 ──┼──► Bus ──► listener ──► SubscriberSet
//! Supervisor #N ──┤        └─► caller receivers
//! shutdown() ─────┘
//! ```
//!
//! ## Rules
//! - `publish()` never blocks and never fails; with no receivers the event is dropped.
//! - One ring buffer of `capacity` events is shared by all receivers; a receiver that
//!   falls behind observes `RecvError::Lagged(n)` and skips `n` events.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for queue events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all current receivers.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a receiver that observes events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}
