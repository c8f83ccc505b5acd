//! # Event subscribers for the slotvisor queue.
//!
//! ```text
//! Supervisor ── publish(Event) ──► Bus ──► queue listener ──► SubscriberSet
//!                                                        ┌─────────┼─────────┐
//!                                                        ▼         ▼         ▼
//!                                                    LogWriter  Metrics   Custom
//! ```
//!
//! Implement [`Subscribe`] for custom handlers (metrics, audit, alerts).
//! [`LogWriter`] is the built-in `tracing` renderer.

mod log;
mod subscriber;
mod subscriber_set;

pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;

pub(crate) use subscriber_set::panic_message;
