//! Queue events: types and broadcast bus.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `WorkQueue` (accept, shutdown, drain), supervisors (job outcome,
//!   slot release), `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the queue listener (fans out to `SubscriberSet`) and any receiver
//!   obtained from `WorkQueue::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
