//! # Job abstractions.
//!
//! This module provides the job-related types:
//! - [`Job`] - trait for implementing async cancelable jobs over an I/O envelope
//! - [`JobFn`] - closure-based job implementation
//! - [`JobRef`] - shared reference to a job (`Arc<dyn Job<I, O>>`)
//! - [`IoEnvelope`] - caller-owned input/output pair forwarded to the job untouched

mod io;
mod job;
mod job_fn;

pub use io::IoEnvelope;
pub use job::{BoxJobFuture, Job, JobRef};
pub use job_fn::JobFn;
