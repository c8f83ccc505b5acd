//! # Function-backed job (`JobFn`)
//!
//! [`JobFn`] wraps a closure `F: Fn(IoEnvelope<I, O>, CancellationToken) -> Fut`,
//! producing a fresh future per submission. Shared state between submissions
//! must be explicit (`Arc<...>` captured by the closure).
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use slotvisor::{IoEnvelope, JobError, JobFn, JobRef};
//!
//! let echo: JobRef<String, String> = JobFn::arc(
//!     "echo",
//!     |io: IoEnvelope<String, String>, _ctx: CancellationToken| async move {
//!         io.output().lock().await.push_str(io.input());
//!         Ok::<_, JobError>(())
//!     },
//! );
//!
//! assert_eq!(echo.name(), "echo");
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::JobError;
use crate::jobs::{BoxJobFuture, IoEnvelope, Job};

/// Function-backed job implementation.
#[derive(Debug)]
pub struct JobFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F> JobFn<F> {
    /// Creates a new function-backed job.
    ///
    /// Prefer [`JobFn::arc`] when you immediately need a [`JobRef`](crate::JobRef).
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }

    /// Creates the job and returns it as a shared handle.
    pub fn arc(name: impl Into<Cow<'static, str>>, f: F) -> Arc<Self> {
        Arc::new(Self::new(name, f))
    }
}

impl<F, Fut, I, O> Job<I, O> for JobFn<F>
where
    F: Fn(IoEnvelope<I, O>, CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), JobError>> + Send + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn spawn(&self, io: IoEnvelope<I, O>, ctx: CancellationToken) -> BoxJobFuture {
        Box::pin((self.f)(io, ctx))
    }
}
