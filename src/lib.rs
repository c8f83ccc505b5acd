//! # slotvisor
//!
//! **Slotvisor** is a fixed-capacity, slot-based job dispatcher for tokio with
//! per-job timeout cancellation.
//!
//! Callers submit a job plus an input/output envelope; the queue places it into
//! one of a bounded number of slots, runs it on a fresh worker task, and cancels
//! the worker if it outlives a caller-supplied deadline.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   insert(job, io, timeout)        insert(...)             try_insert(...)
//!            │                          │                         │
//!            ▼                          ▼                         ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  WorkQueue (coordinator)                                          │
//! │  - SlotTable (atomic state + generation + record per slot)        │
//! │  - Semaphore (one permit per vacant slot)                         │
//! │  - root CancellationToken (parent of every job token)             │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │ Supervisor #1│   │ Supervisor #2│   │ Supervisor #N│
//!   │  (deadline)  │   │  (deadline)  │   │  (deadline)  │
//!   └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!          ▼                  ▼                  ▼
//!   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!   │   Worker #1  │   │   Worker #2  │   │   Worker #N  │
//!   │ job.spawn()  │   │ job.spawn()  │   │ job.spawn()  │
//!   └──────────────┘   └──────────────┘   └──────────────┘
//!
//!   WorkQueue / Supervisors ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                ┌────────┼────────┐
//!                                                                ▼        ▼        ▼
//!                                                            LogWriter  sub2  ... subN
//! ```
//!
//! ### Slot lifecycle
//! ```text
//! Vacant ──(insert: permit + CAS)──► Running ──(supervisor finalizes)──► Vacant
//!
//! Running:
//!   ├─► publish JobAccepted, spawn supervisor
//!   ├─► supervisor: publish JobStarting, spawn worker
//!   ├─► race worker vs deadline
//!   │       ├─ worker first   ─► join
//!   │       └─ deadline first ─► TimeoutHit, cancel token, abort worker, join
//!   ├─► publish terminal event (Completed / Failed / Cancelled / Panicked)
//!   └─► release slot, publish SlotReleased
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                       |
//! |-------------------|---------------------------------------------------------------|------------------------------------------|
//! | **Queue**         | Bounded slots, waiting or non-waiting admission, shutdown.    | [`WorkQueue`], [`QueueBuilder`]          |
//! | **Jobs**          | Define jobs as closures or trait impls over an I/O envelope.  | [`Job`], [`JobFn`], [`JobRef`], [`IoEnvelope`] |
//! | **Subscriber API**| Hook into job and queue lifecycle events.                     | [`Subscribe`], [`LogWriter`]             |
//! | **Errors**        | Typed errors for the queue and for job execution.             | [`QueueError`], [`JobError`]             |
//! | **Configuration** | Capacity, bus size, drain grace.                              | [`QueueConfig`]                          |
//!
//! ## Cancellation caveat
//! A timed-out job has its [`CancellationToken`](tokio_util::sync::CancellationToken)
//! cancelled and its worker aborted. Abort lands at the job's next `.await`; a job that
//! never yields can run past its deadline. Output written after cancellation may race
//! with the caller's own use of the envelope, so wait on [`WorkQueue::drain`] or on
//! events before reading it.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use slotvisor::{IoEnvelope, JobError, JobFn, JobRef, LogWriter, QueueConfig, Subscribe, WorkQueue};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let queue = WorkQueue::builder(QueueConfig::with_capacity(2))
//!         .with_subscribers(subs)
//!         .build()?;
//!
//!     let slow: JobRef<(), ()> = JobFn::arc("slow", |_io: IoEnvelope<(), ()>, ctx: CancellationToken| async move {
//!         tokio::select! {
//!             _ = ctx.cancelled() => Err(JobError::Canceled),
//!             _ = tokio::time::sleep(Duration::from_secs(60)) => Ok(()),
//!         }
//!     });
//!
//!     queue.insert(slow, IoEnvelope::new((), ()), Some(Duration::from_millis(10))).await?;
//!     queue.drain(Duration::from_secs(1)).await?;
//!     assert_eq!(queue.shutdown(), 0);
//!     Ok(())
//! }
//! ```
mod core;
mod error;
mod events;
mod jobs;
mod subscribers;

// ---- Public re-exports ----

pub use core::{
    MAX_CAPACITY, QueueBuilder, QueueConfig, SlotIndex, SlotSnapshot, WorkQueue,
    timeout_from_millis,
};
pub use error::{JobError, QueueError};
pub use events::{Bus, Event, EventKind};
pub use jobs::{BoxJobFuture, IoEnvelope, Job, JobFn, JobRef};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
