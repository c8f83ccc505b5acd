//! # Caller-owned I/O envelope.
//!
//! An [`IoEnvelope`] pairs a shared input with a shared, lockable output.
//! The queue never reads or copies either side; it only hands the envelope to the job.
//! Clones share the same buffers, so the caller keeps one and inspects the output
//! once it knows the job is done (e.g. after [`WorkQueue::drain`](crate::WorkQueue::drain)).
//!
//! A job cancelled on timeout may still have written part of its output.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Mutex;

/// Input/output pair passed through to a job.
pub struct IoEnvelope<I, O> {
    input: Arc<I>,
    output: Arc<Mutex<O>>,
}

impl<I, O> IoEnvelope<I, O> {
    /// Wraps the given input and initial output value.
    pub fn new(input: I, output: O) -> Self {
        Self {
            input: Arc::new(input),
            output: Arc::new(Mutex::new(output)),
        }
    }

    /// Builds an envelope over buffers the caller already shares.
    pub fn from_shared(input: Arc<I>, output: Arc<Mutex<O>>) -> Self {
        Self { input, output }
    }

    /// Returns the input buffer.
    #[inline]
    pub fn input(&self) -> &I {
        &self.input
    }

    /// Returns the output buffer.
    #[inline]
    pub fn output(&self) -> &Mutex<O> {
        &self.output
    }

    /// Returns a new handle to the shared output buffer.
    pub fn output_handle(&self) -> Arc<Mutex<O>> {
        Arc::clone(&self.output)
    }
}

impl<I, O> Clone for IoEnvelope<I, O> {
    fn clone(&self) -> Self {
        Self {
            input: Arc::clone(&self.input),
            output: Arc::clone(&self.output),
        }
    }
}

impl<I: fmt::Debug, O> fmt::Debug for IoEnvelope<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IoEnvelope")
            .field("input", &self.input)
            .finish_non_exhaustive()
    }
}
