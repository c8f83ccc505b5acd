//! # Job abstraction.
//!
//! A [`Job`] has a stable [`name`](Job::name) and a [`spawn`](Job::spawn) method that
//! produces a fresh future for one execution. The future receives the caller's
//! [`IoEnvelope`] and a [`CancellationToken`].
//!
//! ## Cancellation
//! When a job overruns its timeout the queue does two things:
//! - cancels the token (a cooperative checkpoint the job may poll), and
//! - aborts the worker task, which stops the future at its next `.await`.
//!
//! A job that never yields cannot be stopped by either; it runs to completion
//! and its slot stays busy until then.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::jobs::IoEnvelope;

/// Boxed future returned by [`Job::spawn`].
pub type BoxJobFuture = Pin<Box<dyn Future<Output = Result<(), JobError>> + Send + 'static>>;

/// Shared handle to a job.
pub type JobRef<I, O> = Arc<dyn Job<I, O>>;

/// # Asynchronous, cancelable unit of work over an I/O envelope.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use slotvisor::{BoxJobFuture, IoEnvelope, Job, JobError};
///
/// struct Square;
///
/// impl Job<u64, u64> for Square {
///     fn name(&self) -> &str { "square" }
///
///     fn spawn(&self, io: IoEnvelope<u64, u64>, ctx: CancellationToken) -> BoxJobFuture {
///         Box::pin(async move {
///             if ctx.is_cancelled() {
///                 return Err(JobError::Canceled);
///             }
///             let n = *io.input();
///             *io.output().lock().await = n * n;
///             Ok(())
///         })
///     }
/// }
/// ```
pub trait Job<I, O>: Send + Sync + 'static {
    /// Returns a stable, human-readable job name.
    fn name(&self) -> &str;

    /// Creates the future for one execution.
    fn spawn(&self, io: IoEnvelope<I, O>, ctx: CancellationToken) -> BoxJobFuture;
}
