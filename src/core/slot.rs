//! # Slot table: fixed-size per-slot execution state.
//!
//! Each slot is a single atomic state word plus a record of the job that owns it.
//!
//! ```text
//!             try_claim (CAS, Acquire)
//!   Vacant ───────────────────────────────► Running
//!     ▲                                        │
//!     └──────── SlotLease::drop (Release) ─────┘
//! ```
//!
//! ## Rules
//! - Only the holder of a [`SlotLease`] may release a slot, and it does so exactly once (on drop).
//! - A slot is reusable iff its state is `Vacant`.
//! - Every claim bumps the slot generation; handles are attached only when the
//!   generation still matches, so a late write never lands on a reused slot.
//! - The permit semaphore never holds more permits than there are vacant slots:
//!   a permit is forgotten on claim and given back only after the slot is vacant.

use std::fmt;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, Semaphore};
use tokio::task::AbortHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const VACANT: u8 = 0;
const RUNNING: u8 = 1;

/// 1-based position of a slot in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(usize);

impl SlotIndex {
    #[inline]
    pub(crate) fn from_offset(offset: usize) -> Self {
        Self(offset + 1)
    }

    /// Returns the 1-based slot number.
    #[inline]
    pub fn get(self) -> usize {
        self.0
    }

    #[inline]
    pub(crate) fn offset(self) -> usize {
        self.0 - 1
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Point-in-time view of a running slot.
#[derive(Debug, Clone)]
pub struct SlotSnapshot {
    /// Slot the job occupies.
    pub index: SlotIndex,
    /// Job name.
    pub job: Arc<str>,
    /// Timeout the job was accepted with (`None` = no cancellation).
    pub timeout: Option<Duration>,
    /// Time since the job was accepted.
    pub running_for: Duration,
}

/// What a running slot knows about its job.
pub(crate) struct SlotRecord {
    /// Job name (for events and diagnostics).
    pub job: Arc<str>,
    /// Timeout the job was accepted with (`None` = no cancellation).
    pub timeout: Option<Duration>,
    /// When the coordinator accepted the job.
    pub accepted_at: Instant,
    /// Per-job token, a child of the queue root token.
    pub token: CancellationToken,
    /// Supervisor task.
    pub monitor: Option<AbortHandle>,
    /// Worker task.
    pub worker: Option<AbortHandle>,
}

impl SlotRecord {
    pub fn new(job: Arc<str>, timeout: Option<Duration>, token: CancellationToken) -> Self {
        Self {
            job,
            timeout,
            accepted_at: Instant::now(),
            token,
            monitor: None,
            worker: None,
        }
    }

    fn cancel_handles(&self) -> CancelHandles {
        CancelHandles {
            token: self.token.clone(),
            worker: self.worker.clone(),
            monitor: self.monitor.clone(),
        }
    }
}

/// Cancellation targets copied out of a record, fired without holding its lock.
struct CancelHandles {
    token: CancellationToken,
    worker: Option<AbortHandle>,
    monitor: Option<AbortHandle>,
}

impl CancelHandles {
    /// Requests cancellation of both execution units. Does not wait.
    fn fire(self) {
        self.token.cancel();
        if let Some(worker) = self.worker {
            worker.abort();
        }
        if let Some(monitor) = self.monitor {
            monitor.abort();
        }
    }
}

struct Slot {
    state: AtomicU8,
    generation: AtomicU64,
    record: Mutex<Option<SlotRecord>>,
}

impl Slot {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(VACANT),
            generation: AtomicU64::new(0),
            record: Mutex::new(None),
        }
    }

    fn try_claim(&self) -> bool {
        self.state
            .compare_exchange(VACANT, RUNNING, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    fn is_running(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNNING
    }

    fn record(&self) -> MutexGuard<'_, Option<SlotRecord>> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Fixed-size table of slots shared by coordinators and supervisors.
pub(crate) struct SlotTable {
    slots: Box<[Slot]>,
    /// One permit per vacant, unclaimed slot.
    permits: Semaphore,
    /// Woken every time a slot becomes vacant.
    released: Notify,
}

impl SlotTable {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            slots: (0..capacity).map(|_| Slot::new()).collect(),
            permits: Semaphore::new(capacity),
            released: Notify::new(),
        })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn permits(&self) -> &Semaphore {
        &self.permits
    }

    /// Stops admission: pending and future permit acquisitions fail.
    pub fn close(&self) {
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    /// Attempts to claim the slot at `offset`.
    pub fn try_claim(self: &Arc<Self>, offset: usize) -> Option<SlotLease> {
        let slot = &self.slots[offset];
        if !slot.try_claim() {
            return None;
        }
        let generation = slot.generation.fetch_add(1, Ordering::AcqRel) + 1;
        Some(SlotLease {
            table: Arc::clone(self),
            offset,
            generation,
        })
    }

    /// Attaches the supervisor handle if the slot still belongs to `generation`.
    pub fn attach_monitor(&self, index: SlotIndex, generation: u64, handle: AbortHandle) -> bool {
        self.with_record(index, generation, |record| record.monitor = Some(handle))
    }

    /// Attaches the worker handle if the slot still belongs to `generation`.
    pub fn attach_worker(&self, index: SlotIndex, generation: u64, handle: AbortHandle) -> bool {
        self.with_record(index, generation, |record| record.worker = Some(handle))
    }

    fn with_record(
        &self,
        index: SlotIndex,
        generation: u64,
        f: impl FnOnce(&mut SlotRecord),
    ) -> bool {
        let slot = &self.slots[index.offset()];
        let mut record = slot.record();
        if slot.generation.load(Ordering::Acquire) != generation {
            return false;
        }
        match record.as_mut() {
            Some(record) => {
                f(record);
                true
            }
            None => false,
        }
    }

    /// Cancels the job in `index` if it is running. Returns whether it was running.
    ///
    /// Cancellation is requested, not awaited; the supervisor still finalizes the slot.
    pub fn force_cancel(&self, index: SlotIndex) -> bool {
        let slot = &self.slots[index.offset()];
        let handles = {
            let record = slot.record();
            if !slot.is_running() {
                return false;
            }
            record.as_ref().map(SlotRecord::cancel_handles)
        };
        if let Some(handles) = handles {
            handles.fire();
        }
        true
    }

    /// Returns what `index` is running right now, if anything.
    pub fn snapshot(&self, index: SlotIndex) -> Option<SlotSnapshot> {
        self.slots[index.offset()]
            .record()
            .as_ref()
            .map(|record| SlotSnapshot {
                index,
                job: Arc::clone(&record.job),
                timeout: record.timeout,
                running_for: record.accepted_at.elapsed(),
            })
    }

    /// Returns the slots that are currently running, in index order.
    pub fn busy_slots(&self) -> Vec<SlotIndex> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_running())
            .map(|(offset, _)| SlotIndex::from_offset(offset))
            .collect()
    }

    /// Resolves once every slot is vacant.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.slots.iter().all(|slot| !slot.is_running()) {
                return;
            }
            notified.await;
        }
    }

    fn release(&self, offset: usize, generation: u64) {
        let slot = &self.slots[offset];
        {
            let mut record = slot.record();
            if slot.generation.load(Ordering::Acquire) == generation {
                record.take();
            }
        }
        slot.state.store(VACANT, Ordering::Release);
        self.permits.add_permits(1);
        self.released.notify_waiters();
    }
}

/// Exclusive ownership of one running slot.
///
/// Dropping the lease finalizes the slot: clears its record, marks it vacant,
/// and returns its admission permit. This runs on every exit path of the owner,
/// including abort and panic.
pub(crate) struct SlotLease {
    table: Arc<SlotTable>,
    offset: usize,
    generation: u64,
}

impl SlotLease {
    #[inline]
    pub fn index(&self) -> SlotIndex {
        SlotIndex::from_offset(self.offset)
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stores the job record for this claim.
    pub fn install(&self, record: SlotRecord) {
        *self.table.slots[self.offset].record() = Some(record);
    }

    pub fn attach_worker(&self, handle: AbortHandle) -> bool {
        self.table
            .attach_worker(self.index(), self.generation, handle)
    }
}

impl Drop for SlotLease {
    fn drop(&mut self) {
        self.table.release(self.offset, self.generation);
    }
}

impl fmt::Debug for SlotLease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SlotLease")
            .field("index", &self.index())
            .field("generation", &self.generation)
            .finish()
    }
}
