//! # WorkQueue: fixed-capacity slot dispatcher with per-job timeouts.
//!
//! The [`WorkQueue`] owns the slot table, the event bus, and the root
//! cancellation token. Every accepted job gets its own supervisor task and
//! worker task; nothing is pooled or reused across jobs.
//!
//! ## Architecture
//! ```text
//! insert(job, io, timeout)
//!     │
//!     ├─► dispatch::acquire()      wait for a permit, CAS-claim a slot
//!     ├─► install SlotRecord       job name, timeout, child token
//!     ├─► publish JobAccepted
//!     └─► spawn Supervisor ──► spawn Worker ──► job.spawn(io, token)
//!              │
//!              └─► race worker vs deadline ─► join ─► report ─► release slot
//!
//! shutdown()
//!     ├─► close admission          pending/future inserts → Closed
//!     ├─► force-cancel running     token.cancel() + abort worker/supervisor
//!     ├─► root.cancel()
//!     └─► publish ShutdownCompleted(busy)
//! ```
//!
//! ## Rules
//! - `insert` returns once the job is handed to its supervisor; it says nothing
//!   about completion. Use [`WorkQueue::drain`] or events for that.
//! - Within one slot, supervisors are strictly sequential.
//! - `shutdown` is idempotent; the second call reports `0`.
//! - Dropping the queue shuts it down.
//! - A job force-cancelled by `shutdown` ends at `SlotForceCancelled`; its
//!   supervisor is aborted and publishes nothing further.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//! use slotvisor::{IoEnvelope, JobError, JobFn, JobRef, WorkQueue};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = WorkQueue::init(4)?;
//!
//!     let square: JobRef<u64, u64> = JobFn::arc("square", |io: IoEnvelope<u64, u64>, _ctx: CancellationToken| async move {
//!         let x = *io.input();
//!         *io.output().lock().await = x * x;
//!         Ok::<_, JobError>(())
//!     });
//!
//!     let io = IoEnvelope::new(7, 0);
//!     let slot = queue.insert(square, io.clone(), Some(Duration::from_secs(1))).await?;
//!     assert!((1..=4).contains(&slot.get()));
//!
//!     queue.drain(Duration::from_secs(1)).await?;
//!     assert_eq!(*io.output().lock().await, 49);
//!     assert_eq!(queue.shutdown(), 0);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::builder::QueueBuilder;
use super::config::QueueConfig;
use super::dispatch;
use super::signals;
use super::slot::{SlotIndex, SlotLease, SlotRecord, SlotSnapshot, SlotTable};
use super::supervisor::{JobDescriptor, Supervisor};
use crate::error::QueueError;
use crate::events::{Bus, Event, EventKind};
use crate::jobs::{IoEnvelope, JobRef};

/// Fixed-capacity job dispatcher.
pub struct WorkQueue {
    cfg: QueueConfig,
    table: Arc<SlotTable>,
    bus: Bus,
    runtime: Handle,
    /// Parent of every job token.
    root: CancellationToken,
    /// Set by the first `shutdown`.
    closed: AtomicBool,
    /// Stops the bus → subscribers listener.
    listener_stop: CancellationToken,
}

impl WorkQueue {
    pub(super) fn new_internal(
        cfg: QueueConfig,
        bus: Bus,
        runtime: Handle,
        listener_stop: CancellationToken,
    ) -> Self {
        Self {
            table: SlotTable::new(cfg.capacity),
            cfg,
            bus,
            runtime,
            root: CancellationToken::new(),
            closed: AtomicBool::new(false),
            listener_stop,
        }
    }

    /// Returns a builder for a queue with the given configuration.
    pub fn builder(cfg: QueueConfig) -> QueueBuilder {
        QueueBuilder::new(cfg)
    }

    /// Creates a queue with `capacity` slots and default settings.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// - [`QueueError::InvalidCapacity`] if `capacity` is `0` or above [`MAX_CAPACITY`](crate::MAX_CAPACITY)
    /// - [`QueueError::NoRuntime`] outside a tokio runtime
    pub fn init(capacity: usize) -> Result<Arc<Self>, QueueError> {
        Self::builder(QueueConfig::with_capacity(capacity)).build()
    }

    /// Submits a job, waiting for a vacant slot if all are busy.
    ///
    /// Returns the slot the job was placed in. `timeout` of `None` or zero
    /// means the job is never cancelled for running too long.
    ///
    /// # Errors
    /// [`QueueError::Closed`] if the queue is (or becomes, while waiting) shut down.
    pub async fn insert<I, O>(
        &self,
        job: JobRef<I, O>,
        io: IoEnvelope<I, O>,
        timeout: Option<Duration>,
    ) -> Result<SlotIndex, QueueError>
    where
        I: Send + Sync + 'static,
        O: Send + 'static,
    {
        let lease = dispatch::acquire(&self.table).await?;
        self.dispatch(lease, job, io, timeout)
    }

    /// Submits a job only if a slot is vacant right now.
    ///
    /// # Errors
    /// - [`QueueError::Saturated`] if every slot is busy
    /// - [`QueueError::Closed`] after shutdown
    pub fn try_insert<I, O>(
        &self,
        job: JobRef<I, O>,
        io: IoEnvelope<I, O>,
        timeout: Option<Duration>,
    ) -> Result<SlotIndex, QueueError>
    where
        I: Send + Sync + 'static,
        O: Send + 'static,
    {
        let lease = dispatch::try_acquire(&self.table)?;
        self.dispatch(lease, job, io, timeout)
    }

    /// Hands a claimed slot to a freshly spawned supervisor.
    fn dispatch<I, O>(
        &self,
        lease: SlotLease,
        job: JobRef<I, O>,
        io: IoEnvelope<I, O>,
        timeout: Option<Duration>,
    ) -> Result<SlotIndex, QueueError>
    where
        I: Send + Sync + 'static,
        O: Send + 'static,
    {
        let index = lease.index();
        let generation = lease.generation();
        let name: Arc<str> = Arc::from(job.name());
        let token = self.root.child_token();

        lease.install(SlotRecord::new(Arc::clone(&name), timeout, token.clone()));
        if self.table.is_closed() {
            return Err(QueueError::Closed);
        }

        let mut accepted = Event::new(EventKind::JobAccepted)
            .with_index(index)
            .with_job(name);
        if let Some(d) = timeout.filter(|d| !d.is_zero()) {
            accepted = accepted.with_timeout(d);
        }
        self.bus.publish(accepted);

        let supervisor = Supervisor::new(
            lease,
            JobDescriptor {
                job,
                io,
                timeout,
                token,
            },
            self.bus.clone(),
            self.runtime.clone(),
        );
        let monitor = self.runtime.spawn(supervisor.run());
        self.table
            .attach_monitor(index, generation, monitor.abort_handle());
        Ok(index)
    }

    /// Stops admission and force-cancels every running job.
    ///
    /// Returns how many slots were still running. Cancellation is requested,
    /// not awaited. Calling it again returns `0` and does nothing.
    pub fn shutdown(&self) -> usize {
        if self.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }
        self.table.close();

        let mut busy = 0;
        for index in self.table.busy_slots() {
            let job = self.table.snapshot(index).map(|s| s.job);
            if !self.table.force_cancel(index) {
                continue;
            }
            busy += 1;
            let mut ev = Event::new(EventKind::SlotForceCancelled).with_index(index);
            if let Some(job) = job {
                ev = ev.with_job(job);
            }
            self.bus.publish(ev);
        }
        self.root.cancel();

        self.bus
            .publish(Event::new(EventKind::ShutdownCompleted).with_busy(busy));
        busy
    }

    /// Waits until every slot is vacant, up to `grace`.
    ///
    /// Does not stop admission; jobs inserted meanwhile are waited for too.
    ///
    /// # Errors
    /// [`QueueError::GraceExceeded`] with the slots still running.
    pub async fn drain(&self, grace: Duration) -> Result<(), QueueError> {
        match tokio::time::timeout(grace, self.table.wait_idle()).await {
            Ok(()) => {
                self.bus.publish(Event::new(EventKind::AllJobsDrained));
                Ok(())
            }
            Err(_elapsed) => {
                let busy = self.table.busy_slots();
                self.bus.publish(
                    Event::new(EventKind::GraceExceeded)
                        .with_busy(busy.len())
                        .with_timeout(grace),
                );
                Err(QueueError::GraceExceeded { grace, busy })
            }
        }
    }

    /// Closes admission, drains for [`QueueConfig::grace`], then shuts down.
    ///
    /// Returns the number of jobs force-cancelled after the grace period.
    pub async fn graceful_shutdown(&self) -> usize {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.table.close();
        if let Err(e) = self.drain(self.cfg.grace).await {
            debug!(target: "slotvisor", error = %e, "drain incomplete, force-cancelling");
        }
        self.shutdown()
    }

    /// Waits for a termination signal, then runs [`WorkQueue::graceful_shutdown`].
    ///
    /// # Errors
    /// [`QueueError::Signal`] if the signal listeners cannot be installed.
    pub async fn run_until_signal(&self) -> Result<usize, QueueError> {
        signals::wait_for_termination().await?;
        Ok(self.graceful_shutdown().await)
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Slots currently running a job, in index order.
    pub fn busy_slots(&self) -> Vec<SlotIndex> {
        self.table.busy_slots()
    }

    /// What every busy slot is running right now.
    pub fn running(&self) -> Vec<SlotSnapshot> {
        self.table
            .busy_slots()
            .into_iter()
            .filter_map(|index| self.table.snapshot(index))
            .collect()
    }

    /// Returns true once admission is closed.
    pub fn is_closed(&self) -> bool {
        self.table.is_closed()
    }

    /// Returns the queue configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.cfg
    }

    /// Receives every event published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }
}

impl Drop for WorkQueue {
    fn drop(&mut self) {
        self.shutdown();
        self.listener_stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::JobError;
    use crate::jobs::JobFn;

    fn noop() -> JobRef<(), ()> {
        JobFn::arc(
            "noop",
            |_io: IoEnvelope<(), ()>, _ctx: CancellationToken| async move { Ok::<_, JobError>(()) },
        )
    }

    fn blocker() -> JobRef<(), ()> {
        JobFn::arc(
            "blocker",
            |_io: IoEnvelope<(), ()>, _ctx: CancellationToken| async move {
                std::future::pending::<()>().await;
                Ok::<_, JobError>(())
            },
        )
    }

    #[tokio::test]
    async fn accepted_event_carries_slot_and_timeout() {
        let queue = WorkQueue::init(2).unwrap();
        let mut rx = queue.subscribe();

        let slot = queue
            .insert(noop(), IoEnvelope::new((), ()), Some(Duration::from_millis(250)))
            .await
            .unwrap();

        let ev = loop {
            let ev = rx.recv().await.unwrap();
            if ev.kind == EventKind::JobAccepted {
                break ev;
            }
        };
        assert_eq!(ev.slot, Some(slot.get()));
        assert_eq!(ev.job_name(), "noop");
        assert_eq!(ev.timeout_ms, Some(250));
    }

    #[tokio::test]
    async fn running_reports_busy_slots() {
        let queue = WorkQueue::init(3).unwrap();
        queue
            .insert(blocker(), IoEnvelope::new((), ()), None)
            .await
            .unwrap();

        let running = queue.running();
        assert_eq!(running.len(), 1);
        assert_eq!(running[0].index.get(), 1);
        assert_eq!(&*running[0].job, "blocker");
        assert!(running[0].timeout.is_none());

        assert_eq!(queue.shutdown(), 1);
        assert!(queue.is_closed());
    }

    #[tokio::test]
    async fn shutdown_publishes_force_cancel_per_busy_slot() {
        let queue = WorkQueue::init(4).unwrap();
        let mut rx = queue.subscribe();
        for _ in 0..2 {
            queue
                .insert(blocker(), IoEnvelope::new((), ()), None)
                .await
                .unwrap();
        }
        assert_eq!(queue.shutdown(), 2);

        let mut forced = 0;
        let completed = loop {
            let ev = rx.recv().await.unwrap();
            match ev.kind {
                EventKind::SlotForceCancelled => forced += 1,
                EventKind::ShutdownCompleted => break ev,
                _ => {}
            }
        };
        assert_eq!(forced, 2);
        assert_eq!(completed.busy, Some(2));

        queue.drain(Duration::from_secs(1)).await.unwrap();
        assert!(queue.busy_slots().is_empty());
    }

    #[tokio::test]
    async fn force_cancelled_job_ends_at_slot_force_cancelled() {
        let queue = WorkQueue::init(1).unwrap();
        let mut rx = queue.subscribe();
        let slot = queue
            .insert(blocker(), IoEnvelope::new((), ()), None)
            .await
            .unwrap();

        loop {
            if rx.recv().await.unwrap().kind == EventKind::JobStarting {
                break;
            }
        }
        assert_eq!(queue.shutdown(), 1);
        queue.drain(Duration::from_secs(1)).await.unwrap();

        let mut after = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            after.push(ev);
        }
        let forced = after
            .iter()
            .position(|e| e.kind == EventKind::SlotForceCancelled)
            .expect("force-cancel event");
        assert_eq!(after[forced].slot, Some(slot.get()));
        assert_eq!(after[forced].job_name(), "blocker");
        assert!(
            after
                .iter()
                .all(|e| !e.is_job_terminal() && e.kind != EventKind::SlotReleased)
        );
        assert!(queue.busy_slots().is_empty());
    }

    #[tokio::test]
    async fn drain_reports_stuck_slots() {
        let queue = WorkQueue::init(2).unwrap();
        let slot = queue
            .insert(blocker(), IoEnvelope::new((), ()), None)
            .await
            .unwrap();

        match queue.drain(Duration::from_millis(20)).await {
            Err(QueueError::GraceExceeded { busy, .. }) => assert_eq!(busy, vec![slot]),
            other => panic!("expected GraceExceeded, got {other:?}"),
        }
        queue.shutdown();
    }

    #[tokio::test]
    async fn graceful_shutdown_cancels_what_outlives_grace() {
        let cfg = QueueConfig {
            capacity: 2,
            grace: Duration::from_millis(20),
            ..QueueConfig::default()
        };
        let queue = WorkQueue::builder(cfg).build().unwrap();
        queue
            .insert(blocker(), IoEnvelope::new((), ()), None)
            .await
            .unwrap();

        assert_eq!(queue.graceful_shutdown().await, 1);
        assert!(matches!(
            queue.try_insert(noop(), IoEnvelope::new((), ()), None),
            Err(QueueError::Closed)
        ));
    }
}
