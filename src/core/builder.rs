use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use super::config::QueueConfig;
use super::queue::WorkQueue;
use crate::error::QueueError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for a [`WorkQueue`] with optional subscribers.
pub struct QueueBuilder {
    cfg: QueueConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl QueueBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: QueueConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers.
    ///
    /// Subscribers receive queue events (job lifecycle, timeouts, shutdown)
    /// through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the queue on the current tokio runtime.
    ///
    /// Initializes:
    /// - the event bus and the subscriber listener
    /// - the slot table, every slot vacant
    ///
    /// # Errors
    /// - [`QueueError::InvalidCapacity`] for a capacity outside `1..=MAX_CAPACITY`
    /// - [`QueueError::NoRuntime`] when called outside a tokio runtime
    pub fn build(self) -> Result<Arc<WorkQueue>, QueueError> {
        self.cfg.validate()?;
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;

        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener_stop = CancellationToken::new();
        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus.clone(), &runtime);
            runtime.spawn(subscriber_listener(bus.subscribe(), subs, listener_stop.clone()));
        }

        let capacity = self.cfg.capacity;
        let queue = WorkQueue::new_internal(self.cfg, bus.clone(), runtime, listener_stop);
        bus.publish(Event::new(EventKind::QueueInitialized).with_busy(capacity));
        Ok(Arc::new(queue))
    }
}

/// Forwards bus events to subscribers until stopped, then flushes them.
///
/// Events already buffered when the stop fires are still forwarded.
async fn subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    subs: SubscriberSet,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            ev = rx.recv() => match ev {
                Ok(ev) => subs.emit(&ev),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            },
            _ = stop.cancelled() => break,
        }
    }
    subs.shutdown().await;
}
