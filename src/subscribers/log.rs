//! # LogWriter: renders queue events through `tracing`.
//!
//! Levels follow severity:
//! - `error`: job or subscriber panics
//! - `warn`: timeouts, failures, forced cancellation, drain grace exceeded
//! - `info`: queue lifecycle
//! - `debug`: per-job progress
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  slotvisor: queue initialized capacity=10
//! DEBUG slotvisor: job accepted slot=3 job="resize" timeout_ms=100
//! WARN  slotvisor: job timed out slot=3 job="resize" timeout_ms=100
//! WARN  slotvisor: job cancelled slot=3 job="resize" reason="aborted"
//! INFO  slotvisor: shutdown completed busy=0
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that writes every event to the active `tracing` dispatcher.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        log_event(e);
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }

    fn queue_capacity(&self) -> usize {
        2048
    }
}

/// Writes one event at the level matching its kind.
fn log_event(e: &Event) {
    let slot = e.slot.unwrap_or(0);
    let job = e.job_name();
    match e.kind {
        EventKind::QueueInitialized => {
            info!(target: "slotvisor", capacity = e.busy.unwrap_or(0), "queue initialized");
        }
        EventKind::ShutdownRequested => {
            info!(target: "slotvisor", "shutdown requested (signal)");
        }
        EventKind::ShutdownCompleted => {
            info!(target: "slotvisor", busy = e.busy.unwrap_or(0), "shutdown completed");
        }
        EventKind::AllJobsDrained => {
            info!(target: "slotvisor", "all jobs drained");
        }
        EventKind::GraceExceeded => {
            warn!(
                target: "slotvisor",
                busy = e.busy.unwrap_or(0),
                grace_ms = e.timeout_ms.unwrap_or(0),
                "drain grace exceeded"
            );
        }
        EventKind::JobAccepted => {
            debug!(target: "slotvisor", slot, job, timeout_ms = ?e.timeout_ms, "job accepted");
        }
        EventKind::JobStarting => {
            debug!(target: "slotvisor", slot, job, "job starting");
        }
        EventKind::JobCompleted => match &e.reason {
            Some(reason) => {
                warn!(target: "slotvisor", slot, job, reason = %reason, "job completed after timeout");
            }
            None => debug!(target: "slotvisor", slot, job, "job completed"),
        },
        EventKind::JobFailed => {
            warn!(target: "slotvisor", slot, job, reason = e.reason_text(), "job failed");
        }
        EventKind::TimeoutHit => {
            warn!(
                target: "slotvisor",
                slot,
                job,
                timeout_ms = e.timeout_ms.unwrap_or(0),
                "job timed out"
            );
        }
        EventKind::JobCancelled => {
            warn!(target: "slotvisor", slot, job, reason = e.reason_text(), "job cancelled");
        }
        EventKind::JobPanicked => {
            error!(target: "slotvisor", slot, job, reason = e.reason_text(), "job panicked");
        }
        EventKind::SlotReleased => {
            debug!(target: "slotvisor", slot, job, "slot released");
        }
        EventKind::SlotForceCancelled => {
            warn!(target: "slotvisor", slot, job, "slot force-cancelled at shutdown");
        }
        EventKind::SubscriberOverflow => {
            warn!(target: "slotvisor", subscriber = job, reason = e.reason_text(), "subscriber overflow");
        }
        EventKind::SubscriberPanicked => {
            error!(target: "slotvisor", subscriber = job, reason = e.reason_text(), "subscriber panicked");
        }
    }
}
