//! # Worker: runs one job future on its own task.
//!
//! The worker is the only place job code executes. Its completion is the
//! supervisor's wake-up signal; its [`JoinHandle`] is the join target.
//!
//! [`WorkerHandle`] aborts the task when dropped, so a supervisor that is itself
//! aborted (forced shutdown) never leaves an orphaned worker behind.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::jobs::{IoEnvelope, JobRef};

/// Result of joining a worker.
pub(crate) type WorkerResult = Result<Result<(), JobError>, JoinError>;

/// Owned handle to a spawned worker.
pub(crate) struct WorkerHandle {
    join: JoinHandle<Result<(), JobError>>,
}

impl WorkerHandle {
    /// Spawns the job on `runtime`.
    ///
    /// A token cancelled before the worker is polled short-circuits to `Canceled`
    /// without running job code.
    pub fn spawn<I, O>(
        runtime: &Handle,
        job: JobRef<I, O>,
        io: IoEnvelope<I, O>,
        ctx: CancellationToken,
    ) -> Self
    where
        I: Send + Sync + 'static,
        O: Send + 'static,
    {
        let join = runtime.spawn(async move {
            if ctx.is_cancelled() {
                return Err(JobError::Canceled);
            }
            job.spawn(io, ctx).await
        });
        Self { join }
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.join.abort_handle()
    }

    /// Requests preemptive cancellation; lands at the job's next `.await`.
    pub fn abort(&self) {
        self.join.abort();
    }
}

impl Future for WorkerHandle {
    type Output = WorkerResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.join).poll(cx)
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.join.abort();
    }
}
