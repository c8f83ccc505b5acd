//! # Queue configuration.
//!
//! Provides [`QueueConfig`] centralized settings for a [`WorkQueue`](crate::WorkQueue).
//!
//! ## Sentinel values
//! - `bus_capacity = 0` → clamped to 1 by the bus
//! - per-call timeout `None` or `0` → no cancellation (see [`timeout_from_millis`])

use std::time::Duration;

use crate::error::QueueError;

/// Hard upper bound on the number of slots a queue may have.
pub const MAX_CAPACITY: usize = 100;

/// Configuration for a work queue.
///
/// ## Field semantics
/// - `capacity`: number of slots, `1..=MAX_CAPACITY`
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `grace`: how long [`WorkQueue::run_until_signal`](crate::WorkQueue::run_until_signal)
///   waits for running jobs before force-cancelling them
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Number of slots (fixed for the queue lifetime).
    pub capacity: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages
    /// skip older items.
    pub bus_capacity: usize,

    /// Drain window used on signal-driven shutdown.
    ///
    /// `0s` skips draining: running jobs are force-cancelled immediately.
    pub grace: Duration,
}

impl QueueConfig {
    /// Creates a config with the given capacity and defaults for everything else.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// Checks the capacity against `1..=MAX_CAPACITY`.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.capacity == 0 || self.capacity > MAX_CAPACITY {
            return Err(QueueError::InvalidCapacity {
                capacity: self.capacity,
                max: MAX_CAPACITY,
            });
        }
        Ok(())
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `capacity = 10`
    /// - `bus_capacity = 1024`
    /// - `grace = 5s`
    fn default() -> Self {
        Self {
            capacity: 10,
            bus_capacity: 1024,
            grace: Duration::from_secs(5),
        }
    }
}

/// Converts a millisecond timeout into the queue's timeout form.
///
/// Zero or negative values mean "no cancellation, wait indefinitely".
///
/// ```
/// use std::time::Duration;
/// use slotvisor::timeout_from_millis;
///
/// assert_eq!(timeout_from_millis(100), Some(Duration::from_millis(100)));
/// assert_eq!(timeout_from_millis(0), None);
/// assert_eq!(timeout_from_millis(-5), None);
/// ```
pub fn timeout_from_millis(ms: i64) -> Option<Duration> {
    u64::try_from(ms)
        .ok()
        .filter(|ms| *ms > 0)
        .map(Duration::from_millis)
}
