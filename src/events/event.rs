//! # Queue events emitted by the coordinator, supervisors and lifecycle calls.
//!
//! [`EventKind`] groups events into:
//! - **Lifecycle**: queue initialized, shutdown, drain results
//! - **Job**: accepted, starting, completed/failed/cancelled/panicked, timeout hit
//! - **Slot**: released after a job, force-cancelled at shutdown
//! - **Subscriber**: overflow and panic reports from the fan-out layer
//!
//! ## Ordering guarantees
//! Each event carries a process-wide monotonic sequence number (`seq`).
//! Events of one job are published in order by a single supervisor, so
//! `JobAccepted < JobStarting < (terminal) < SlotReleased` by `seq`.
//!
//! Shutdown cuts that sequence short: a job still running when
//! [`WorkQueue::shutdown`](crate::WorkQueue::shutdown) scans its slot has its
//! supervisor aborted, so it publishes no terminal event and no `SlotReleased`.
//! `SlotForceCancelled` is the last event for that job; the slot is still freed.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use slotvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TimeoutHit)
//!     .with_job("resize")
//!     .with_slot(3)
//!     .with_timeout(Duration::from_millis(250));
//!
//! assert_eq!(ev.kind, EventKind::TimeoutHit);
//! assert_eq!(ev.job.as_deref(), Some("resize"));
//! assert_eq!(ev.timeout_ms, Some(250));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::SlotIndex;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Queue lifecycle ===
    /// Queue built and ready.
    ///
    /// Sets: `busy` = capacity.
    QueueInitialized,

    /// Termination signal observed by [`WorkQueue::run_until_signal`](crate::WorkQueue::run_until_signal).
    ShutdownRequested,

    /// Shutdown finished scanning slots.
    ///
    /// Sets: `busy` = number of slots force-cancelled.
    ShutdownCompleted,

    /// Every slot became vacant within the drain grace period.
    AllJobsDrained,

    /// Drain grace period ran out with jobs still running.
    ///
    /// Sets: `busy`, `timeout_ms` (grace).
    GraceExceeded,

    // === Job lifecycle ===
    /// Coordinator claimed a slot for the job.
    ///
    /// Sets: `slot`, `job`, `timeout_ms` (if any).
    JobAccepted,

    /// Supervisor started the worker.
    ///
    /// Sets: `slot`, `job`.
    JobStarting,

    /// Job returned `Ok`.
    ///
    /// Sets: `slot`, `job`; `reason` if it finished after its timeout fired.
    JobCompleted,

    /// Job returned an error other than `Canceled`.
    ///
    /// Sets: `slot`, `job`, `reason`.
    JobFailed,

    /// Job deadline elapsed; cancellation was requested.
    ///
    /// Sets: `slot`, `job`, `timeout_ms`.
    TimeoutHit,

    /// Job stopped because of cancellation (cooperative or aborted).
    ///
    /// Sets: `slot`, `job`, `reason`.
    JobCancelled,

    /// Job panicked; the panic was contained in its worker.
    ///
    /// Sets: `slot`, `job`, `reason`.
    JobPanicked,

    // === Slot ===
    /// Slot is vacant again.
    ///
    /// Sets: `slot`, `job`.
    SlotReleased,

    /// Shutdown found the slot running and requested cancellation.
    ///
    /// Last event of that job: its supervisor is aborted before reporting.
    ///
    /// Sets: `slot`, `job` (if known).
    SlotForceCancelled,

    // === Subscribers ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `job` = subscriber name, `reason`.
    SubscriberOverflow,

    /// Subscriber panicked during event processing.
    ///
    /// Sets: `job` = subscriber name, `reason` = panic info.
    SubscriberPanicked,
}

/// Queue event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// 1-based slot number, if applicable.
    pub slot: Option<usize>,
    /// Job name (or subscriber name for subscriber events).
    pub job: Option<Arc<str>>,
    /// Timeout in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Human-readable reason (errors, cancellation cause, etc.).
    pub reason: Option<Arc<str>>,
    /// Slot count (capacity or busy slots, depending on kind).
    pub busy: Option<usize>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            slot: None,
            job: None,
            timeout_ms: None,
            reason: None,
            busy: None,
        }
    }

    /// Attaches a 1-based slot number.
    #[inline]
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Attaches a slot index.
    #[inline]
    pub fn with_index(self, index: SlotIndex) -> Self {
        self.with_slot(index.get())
    }

    /// Attaches a job name.
    #[inline]
    pub fn with_job(mut self, job: impl Into<Arc<str>>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a slot count.
    #[inline]
    pub fn with_busy(mut self, busy: usize) -> Self {
        self.busy = Some(busy);
        self
    }

    /// Returns the job name or `"unknown"`.
    #[inline]
    pub fn job_name(&self) -> &str {
        self.job.as_deref().unwrap_or("unknown")
    }

    /// Returns the reason or `"unknown"`.
    #[inline]
    pub fn reason_text(&self) -> &str {
        self.reason.as_deref().unwrap_or("unknown")
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_job(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_job(subscriber)
            .with_reason(info)
    }

    /// Returns true for the events that end one job's execution.
    #[inline]
    pub fn is_job_terminal(&self) -> bool {
        matches!(
            self.kind,
            EventKind::JobCompleted
                | EventKind::JobFailed
                | EventKind::JobCancelled
                | EventKind::JobPanicked
        )
    }
}
