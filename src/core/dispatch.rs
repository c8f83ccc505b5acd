//! # Slot acquisition for the dispatch coordinator.
//!
//! ```text
//! permits.acquire()  ──►  forget permit  ──►  circular CAS scan from slot 0  ──►  SlotLease
//!   (waits while saturated)                  (wraps until a claim succeeds)
//! ```
//!
//! ## Rules
//! - Holding a permit guarantees that some slot is vacant or about to be: a
//!   permit is only returned after its slot has been marked vacant.
//! - The scan therefore terminates; it only spins when several submitters race
//!   for the same vacant slot.
//! - A closed semaphore (queue shut down) fails admission with [`QueueError::Closed`].

use std::sync::Arc;

use tokio::sync::TryAcquireError;

use super::slot::{SlotLease, SlotTable};
use crate::error::QueueError;

/// Waits for a vacant slot and claims it.
pub(crate) async fn acquire(table: &Arc<SlotTable>) -> Result<SlotLease, QueueError> {
    let permit = table
        .permits()
        .acquire()
        .await
        .map_err(|_closed| QueueError::Closed)?;
    permit.forget();
    Ok(scan(table))
}

/// Claims a vacant slot without waiting.
pub(crate) fn try_acquire(table: &Arc<SlotTable>) -> Result<SlotLease, QueueError> {
    match table.permits().try_acquire() {
        Ok(permit) => {
            permit.forget();
            Ok(scan(table))
        }
        Err(TryAcquireError::NoPermits) => Err(QueueError::Saturated),
        Err(TryAcquireError::Closed) => Err(QueueError::Closed),
    }
}

/// Circular scan starting at slot 0. Caller must hold a forgotten permit.
fn scan(table: &Arc<SlotTable>) -> SlotLease {
    let capacity = table.capacity();
    let mut offset = 0;
    loop {
        if let Some(lease) = table.try_claim(offset) {
            return lease;
        }
        offset += 1;
        if offset == capacity {
            offset = 0;
            std::hint::spin_loop();
        }
    }
}
