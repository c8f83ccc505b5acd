//! Error types used by the slotvisor queue and by jobs.
//!
//! This module defines two main error enums:
//!
//! - [`QueueError`] - errors raised by the queue itself (admission, lifecycle).
//! - [`JobError`] - errors returned by individual job executions.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! A job error never affects the queue: it is reported through events and the
//! slot is finalized as usual.

use std::time::Duration;
use thiserror::Error;

use crate::core::SlotIndex;

/// # Errors produced by the work queue.
///
/// Argument errors (invalid capacity) are returned before any side effect.
/// Lifecycle errors (`Closed`, `GraceExceeded`) describe the queue state at the call.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QueueError {
    /// Requested capacity is zero or above the hard maximum.
    #[error("invalid capacity {capacity}; expected 1..={max}")]
    InvalidCapacity {
        /// The requested capacity.
        capacity: usize,
        /// The hard upper bound ([`MAX_CAPACITY`](crate::MAX_CAPACITY)).
        max: usize,
    },

    /// All slots are busy (returned only by non-waiting admission).
    #[error("all slots are busy")]
    Saturated,

    /// The queue was shut down; it accepts no more jobs.
    #[error("queue is shut down")]
    Closed,

    /// The queue was built outside a tokio runtime, so nothing can be spawned.
    #[error("no tokio runtime available to spawn supervisors")]
    NoRuntime,

    /// Jobs were still running when the drain grace period ran out.
    #[error("drain timeout {grace:?} exceeded; busy slots: {busy:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Slots still running when the grace period ended.
        busy: Vec<SlotIndex>,
    },

    /// Installing the termination signal listeners failed.
    #[error("signal listener failed: {0}")]
    Signal(#[from] std::io::Error),
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use slotvisor::QueueError;
    ///
    /// let err = QueueError::InvalidCapacity { capacity: 0, max: 100 };
    /// assert_eq!(err.as_label(), "queue_invalid_capacity");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::InvalidCapacity { .. } => "queue_invalid_capacity",
            QueueError::Saturated => "queue_saturated",
            QueueError::Closed => "queue_closed",
            QueueError::NoRuntime => "queue_no_runtime",
            QueueError::GraceExceeded { .. } => "queue_grace_exceeded",
            QueueError::Signal(_) => "queue_signal",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            QueueError::InvalidCapacity { capacity, max } => {
                format!("capacity {capacity} outside 1..={max}")
            }
            QueueError::Saturated => "no vacant slot".to_string(),
            QueueError::Closed => "queue closed".to_string(),
            QueueError::NoRuntime => "no tokio runtime".to_string(),
            QueueError::GraceExceeded { grace, busy } => {
                format!("grace exceeded after {grace:?}; busy slots={busy:?}")
            }
            QueueError::Signal(e) => format!("signal: {e}"),
        }
    }
}

/// # Errors returned by job execution.
///
/// The dispatcher never retries a job. These errors only surface as
/// [`EventKind::JobFailed`](crate::EventKind::JobFailed) /
/// [`EventKind::JobCancelled`](crate::EventKind::JobCancelled) events.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// Job failed; the message is reported as-is.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Job hit a condition it considers unrecoverable.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Job observed its cancellation token and stopped early.
    #[error("job cancelled")]
    Canceled,
}

impl JobError {
    /// Convenience constructor for [`JobError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        JobError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use slotvisor::JobError;
    ///
    /// assert_eq!(JobError::Canceled.as_label(), "job_canceled");
    /// assert_eq!(JobError::fail("boom").as_label(), "job_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Fail { .. } => "job_failed",
            JobError::Fatal { .. } => "job_fatal",
            JobError::Canceled => "job_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            JobError::Fail { error } => format!("error: {error}"),
            JobError::Fatal { error } => format!("fatal: {error}"),
            JobError::Canceled => "job cancelled".to_string(),
        }
    }
}
