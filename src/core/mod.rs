//! Queue core: slots, dispatch, supervision, lifecycle.
//!
//! The public API from this module is [`WorkQueue`] (with [`QueueBuilder`] and
//! [`QueueConfig`]) plus the slot types it reports.
//!
//! Internal modules:
//! - [`slot`]: slot table, leases and records;
//! - [`dispatch`]: permit acquisition and the circular claim scan;
//! - [`supervisor`]: one task per job, bounds the worker by its deadline;
//! - [`worker`]: one task per job, runs the job future;
//! - [`queue`]: insert, shutdown, drain and introspection;
//! - [`signals`]: termination signal handling.

mod builder;
mod config;
mod dispatch;
mod queue;
mod signals;
mod slot;
mod supervisor;
mod worker;

pub use builder::QueueBuilder;
pub use config::{MAX_CAPACITY, QueueConfig, timeout_from_millis};
pub use queue::WorkQueue;
pub use slot::{SlotIndex, SlotSnapshot};
