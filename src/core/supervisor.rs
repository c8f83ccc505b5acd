//! # Supervisor: owns one slot for the lifetime of one job.
//!
//! Starts the worker, races it against the job deadline, cancels on timeout,
//! joins, reports the outcome, and finally releases the slot.
//!
//! ```text
//! Starting ──► Running ──┬── worker done ─────────────────────┐
//!                        ├── deadline ─► TimedOut (cancel) ───┤
//!                        └── token cancelled (shutdown) ──────┤
//!                                                             ▼
//!                                             join ──► report ──► Finalized
//! ```
//!
//! ## Event flow
//! ```text
//! JobStarting ─► [TimeoutHit] ─► JobCompleted | JobFailed | JobCancelled | JobPanicked ─► SlotReleased
//! ```
//!
//! ## Rules
//! - Without a deadline (`None`, zero, or a timeout too large to add to the
//!   clock) the race is skipped; only queue shutdown can stop the job.
//! - On timeout the job token is cancelled first (cooperative checkpoint) and
//!   the worker is aborted second (lands at its next `.await`). The join still
//!   happens; a job that finishes anyway is reported as completed with reason
//!   `finished_after_timeout`.
//! - Join outcomes never propagate to the queue.
//! - The slot lease is dropped last, on every path. If the supervisor itself
//!   is aborted, dropping it aborts the worker and releases the slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use super::slot::{SlotIndex, SlotLease};
use super::worker::{WorkerHandle, WorkerResult};
use crate::error::JobError;
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{IoEnvelope, JobRef};
use crate::subscribers::panic_message;

/// Everything a supervisor needs to run one accepted job.
pub(crate) struct JobDescriptor<I, O> {
    pub job: JobRef<I, O>,
    pub io: IoEnvelope<I, O>,
    pub timeout: Option<Duration>,
    /// Per-job token, a child of the queue root token.
    pub token: CancellationToken,
}

/// What stopped the race between the worker and its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Finished,
    TimedOut,
    Cancelled,
}

pub(crate) struct Supervisor<I, O> {
    lease: SlotLease,
    descriptor: JobDescriptor<I, O>,
    bus: Bus,
    runtime: Handle,
}

impl<I, O> Supervisor<I, O>
where
    I: Send + Sync + 'static,
    O: Send + 'static,
{
    pub fn new(lease: SlotLease, descriptor: JobDescriptor<I, O>, bus: Bus, runtime: Handle) -> Self {
        Self {
            lease,
            descriptor,
            bus,
            runtime,
        }
    }

    /// Drives the job to completion and finalizes the slot.
    pub async fn run(self) {
        let Self {
            lease,
            descriptor,
            bus,
            runtime,
        } = self;
        let JobDescriptor {
            job,
            io,
            timeout,
            token,
        } = descriptor;

        let index = lease.index();
        let name: Arc<str> = Arc::from(job.name());
        let timeout = timeout.filter(|d| !d.is_zero());

        bus.publish(
            Event::new(EventKind::JobStarting)
                .with_index(index)
                .with_job(Arc::clone(&name)),
        );

        let mut worker = WorkerHandle::spawn(&runtime, job, io, token.clone());
        lease.attach_worker(worker.abort_handle());

        // A deadline past the clock's range is no deadline at all.
        let deadline = timeout.and_then(|dur| Instant::now().checked_add(dur).map(|at| (dur, at)));

        let (stop, res) = match deadline {
            Some((dur, deadline)) => {
                tokio::select! {
                    biased;
                    res = &mut worker => (Stop::Finished, res),
                    _ = time::sleep_until(deadline) => {
                        token.cancel();
                        bus.publish(
                            Event::new(EventKind::TimeoutHit)
                                .with_index(index)
                                .with_job(Arc::clone(&name))
                                .with_timeout(dur),
                        );
                        worker.abort();
                        (Stop::TimedOut, (&mut worker).await)
                    }
                    _ = token.cancelled() => {
                        worker.abort();
                        (Stop::Cancelled, (&mut worker).await)
                    }
                }
            }
            None => {
                tokio::select! {
                    biased;
                    res = &mut worker => (Stop::Finished, res),
                    _ = token.cancelled() => {
                        worker.abort();
                        (Stop::Cancelled, (&mut worker).await)
                    }
                }
            }
        };

        report(&bus, index, &name, stop, res);

        drop(worker);
        drop(lease);
        bus.publish(
            Event::new(EventKind::SlotReleased)
                .with_index(index)
                .with_job(name),
        );
    }
}

/// Publishes exactly one terminal event for the joined worker.
fn report(bus: &Bus, index: SlotIndex, name: &Arc<str>, stop: Stop, res: WorkerResult) {
    let base = |kind| {
        Event::new(kind)
            .with_index(index)
            .with_job(Arc::clone(name))
    };
    let ev = match res {
        Ok(Ok(())) if stop == Stop::TimedOut => {
            base(EventKind::JobCompleted).with_reason("finished_after_timeout")
        }
        Ok(Ok(())) => base(EventKind::JobCompleted),
        Ok(Err(JobError::Canceled)) => base(EventKind::JobCancelled).with_reason(cause(stop, "job_canceled")),
        Ok(Err(e)) => base(EventKind::JobFailed).with_reason(e.to_string()),
        Err(je) if je.is_panic() => {
            base(EventKind::JobPanicked).with_reason(panic_message(&*je.into_panic()))
        }
        Err(_) => base(EventKind::JobCancelled).with_reason(cause(stop, "aborted")),
    };
    bus.publish(ev);
}

fn cause(stop: Stop, fallback: &'static str) -> &'static str {
    match stop {
        Stop::TimedOut => "timeout",
        Stop::Cancelled => "shutdown",
        Stop::Finished => fallback,
    }
}
