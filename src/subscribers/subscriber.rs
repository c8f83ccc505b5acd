//! # Event subscriber trait.
//!
//! Provides [`Subscribe`], the extension point for plugging event handlers into a queue.
//!
//! Each subscriber gets:
//! - **Dedicated worker task** (runs independently)
//! - **Per-subscriber bounded queue** (capacity via [`Subscribe::queue_capacity`])
//! - **Panic isolation** (panics are reported as `EventKind::SubscriberPanicked`)
//!
//! ## Rules
//! - A slow subscriber only affects its own queue; overflow drops the event for
//!   that subscriber only and publishes `EventKind::SubscriberOverflow`.
//! - Events are processed sequentially (FIFO) per subscriber.
//! - Subscribers never block the coordinator or supervisors.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use async_trait::async_trait;
//! use slotvisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct TimeoutCounter(AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for TimeoutCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TimeoutHit {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "timeouts" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Event subscriber for queue observability.
///
/// ### Implementation requirements
/// - Use async I/O; avoid blocking the executor.
/// - Handle errors internally; do not panic.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Processes a single event, from the subscriber's own worker task.
    async fn on_event(&self, event: &Event);

    /// Returns the subscriber name used in overflow/panic events.
    ///
    /// The default uses `type_name::<Self>()`; override it with something short.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Returns the preferred queue capacity for this subscriber (clamped to at least 1).
    ///
    /// Default: 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
