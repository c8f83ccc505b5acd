use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{Barrier, Mutex, Semaphore, oneshot};
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;

use slotvisor::{
    Event, EventKind, IoEnvelope, JobError, JobFn, JobRef, MAX_CAPACITY, QueueConfig, QueueError,
    Subscribe, WorkQueue, timeout_from_millis,
};

type Unit = IoEnvelope<(), ()>;

fn unit() -> Unit {
    IoEnvelope::new((), ())
}

fn instant() -> JobRef<(), ()> {
    JobFn::arc("instant", |_io: Unit, _ctx: CancellationToken| async move {
        Ok::<_, JobError>(())
    })
}

fn blocking() -> JobRef<(), ()> {
    JobFn::arc("blocking", |_io: Unit, _ctx: CancellationToken| async move {
        std::future::pending::<()>().await;
        Ok::<_, JobError>(())
    })
}

/// Blocks until `gate` hands out a permit.
fn gated(gate: Arc<Semaphore>) -> JobRef<(), ()> {
    JobFn::arc("gated", move |_io: Unit, _ctx: CancellationToken| {
        let gate = Arc::clone(&gate);
        async move {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| JobError::fail(e.to_string()))?;
            permit.forget();
            Ok::<_, JobError>(())
        }
    })
}

/// Runs until cancelled, checking the token every 5ms.
fn cooperative() -> JobRef<(), ()> {
    JobFn::arc("cooperative", |_io: Unit, ctx: CancellationToken| async move {
        loop {
            if ctx.is_cancelled() {
                return Err(JobError::Canceled);
            }
            sleep(Duration::from_millis(5)).await;
        }
    })
}

async fn wait_for(rx: &mut broadcast::Receiver<Event>, pred: impl Fn(&Event) -> bool) -> Event {
    timeout(Duration::from_secs(5), async {
        loop {
            match rx.recv().await {
                Ok(ev) if pred(&ev) => return ev,
                Ok(_) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => panic!("bus closed"),
            }
        }
    })
    .await
    .expect("event in time")
}

#[tokio::test]
async fn init_accepts_every_capacity_up_to_max() {
    for capacity in 1..=MAX_CAPACITY {
        let queue = WorkQueue::init(capacity).unwrap();
        assert_eq!(queue.capacity(), capacity);
        assert!(queue.busy_slots().is_empty());
        assert!(!queue.is_closed());
        assert_eq!(queue.shutdown(), 0);
    }
}

#[tokio::test]
async fn init_rejects_zero_and_above_max() {
    for capacity in [0, MAX_CAPACITY + 1, usize::MAX] {
        match WorkQueue::init(capacity) {
            Err(QueueError::InvalidCapacity { capacity: c, max }) => {
                assert_eq!(c, capacity);
                assert_eq!(max, MAX_CAPACITY);
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("capacity {capacity} accepted"),
        }
    }
}

#[tokio::test]
async fn instant_job_frees_its_slot_for_reuse() {
    let queue = WorkQueue::init(3).unwrap();

    let first = queue.insert(instant(), unit(), None).await.unwrap();
    assert!((1..=3).contains(&first.get()));

    queue.drain(Duration::from_secs(1)).await.unwrap();
    assert!(queue.busy_slots().is_empty());

    let second = queue.insert(instant(), unit(), None).await.unwrap();
    assert_eq!(second, first);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn insert_beyond_capacity_waits_until_a_slot_frees() {
    let capacity = 2;
    let queue = WorkQueue::init(capacity).unwrap();
    let gate = Arc::new(Semaphore::new(0));

    for _ in 0..capacity {
        queue
            .insert(gated(Arc::clone(&gate)), unit(), None)
            .await
            .unwrap();
    }
    assert_eq!(queue.busy_slots().len(), capacity);

    let mut pending = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.insert(instant(), unit(), None).await })
    };
    assert!(
        timeout(Duration::from_millis(100), &mut pending)
            .await
            .is_err(),
        "insert returned while every slot was busy"
    );

    gate.add_permits(1);
    let slot = timeout(Duration::from_secs(2), pending)
        .await
        .expect("admitted after a release")
        .unwrap()
        .unwrap();
    assert!((1..=capacity).contains(&slot.get()));

    gate.add_permits(1);
    queue.drain(Duration::from_secs(2)).await.unwrap();
}

#[tokio::test]
async fn timed_out_job_is_cancelled_and_its_slot_freed() {
    let queue = WorkQueue::init(2).unwrap();
    let mut rx = queue.subscribe();

    let slot = queue
        .insert(cooperative(), unit(), Some(Duration::from_millis(50)))
        .await
        .unwrap();

    let hit = wait_for(&mut rx, |e| e.kind == EventKind::TimeoutHit).await;
    assert_eq!(hit.slot, Some(slot.get()));
    assert_eq!(hit.timeout_ms, Some(50));

    let cancelled = wait_for(&mut rx, |e| e.kind == EventKind::JobCancelled).await;
    assert_eq!(cancelled.reason_text(), "timeout");

    wait_for(&mut rx, |e| e.kind == EventKind::SlotReleased).await;
    assert!(queue.busy_slots().is_empty());
}

#[tokio::test]
async fn job_without_timeout_runs_to_completion() {
    assert_eq!(timeout_from_millis(0), None);
    assert_eq!(timeout_from_millis(-5), None);

    let queue = WorkQueue::init(2).unwrap();
    let mut rx = queue.subscribe();

    let slow: JobRef<u32, u32> = JobFn::arc(
        "slow",
        |io: IoEnvelope<u32, u32>, _ctx: CancellationToken| async move {
            sleep(Duration::from_millis(150)).await;
            *io.output().lock().await = *io.input() + 1;
            Ok::<_, JobError>(())
        },
    );
    let io = IoEnvelope::new(41, 0);
    let slow_slot = queue
        .insert(slow, io.clone(), timeout_from_millis(-1))
        .await
        .unwrap();
    queue
        .insert(cooperative(), unit(), timeout_from_millis(20))
        .await
        .unwrap();

    let done = wait_for(&mut rx, |e| {
        e.kind == EventKind::JobCompleted && e.slot == Some(slow_slot.get())
    })
    .await;
    assert!(done.reason.is_none());
    assert_eq!(*io.output().lock().await, 42);
    queue.drain(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn shutdown_reports_running_jobs() {
    let queue = WorkQueue::init(5).unwrap();
    for _ in 0..3 {
        queue.insert(blocking(), unit(), None).await.unwrap();
    }
    queue.insert(instant(), unit(), None).await.unwrap();
    timeout(Duration::from_secs(1), async {
        while queue.busy_slots().len() != 3 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("instant job finished");

    assert_eq!(queue.shutdown(), 3);
    queue.drain(Duration::from_secs(1)).await.unwrap();

    let idle = WorkQueue::init(5).unwrap();
    assert_eq!(idle.shutdown(), 0);
}

#[tokio::test]
async fn second_shutdown_is_a_no_op() {
    let queue = WorkQueue::init(2).unwrap();
    queue.insert(blocking(), unit(), None).await.unwrap();

    assert_eq!(queue.shutdown(), 1);
    assert_eq!(queue.shutdown(), 0);
    assert!(queue.is_closed());
    assert!(matches!(
        queue.insert(instant(), unit(), None).await,
        Err(QueueError::Closed)
    ));
}

#[tokio::test]
async fn shutdown_wakes_waiting_submitters() {
    let queue = WorkQueue::init(1).unwrap();
    queue.insert(blocking(), unit(), None).await.unwrap();

    let pending = {
        let queue = Arc::clone(&queue);
        tokio::spawn(async move { queue.insert(instant(), unit(), None).await })
    };
    tokio::task::yield_now().await;
    queue.shutdown();

    let res = timeout(Duration::from_secs(1), pending)
        .await
        .expect("woken by shutdown")
        .unwrap();
    assert!(matches!(res, Err(QueueError::Closed)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn simultaneous_submitters_get_distinct_slots() {
    let capacity = 8;
    let queue = WorkQueue::init(capacity).unwrap();
    let barrier = Arc::new(Barrier::new(capacity + 1));

    let job: JobRef<(), ()> = {
        let barrier = Arc::clone(&barrier);
        JobFn::arc("rendezvous", move |_io: Unit, _ctx: CancellationToken| {
            let barrier = Arc::clone(&barrier);
            async move {
                barrier.wait().await;
                Ok::<_, JobError>(())
            }
        })
    };

    let mut submitters = Vec::new();
    for _ in 0..capacity {
        let queue = Arc::clone(&queue);
        let job = Arc::clone(&job);
        submitters.push(tokio::spawn(async move {
            queue.insert(job, unit(), None).await
        }));
    }
    let mut slots = HashSet::new();
    for s in submitters {
        slots.insert(s.await.unwrap().unwrap());
    }
    assert_eq!(slots.len(), capacity);
    assert_eq!(queue.running().len(), capacity);

    timeout(Duration::from_secs(2), barrier.wait())
        .await
        .expect("all jobs running at once");
    queue.drain(Duration::from_secs(2)).await.unwrap();
}

/// Input carrying the slot the job was placed in, sent once `insert` returns.
type SlotInput = IoEnvelope<Mutex<oneshot::Receiver<usize>>, ()>;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn each_slot_runs_one_job_at_a_time() {
    let capacity = 4;
    let submissions = 32;
    let queue = WorkQueue::init(capacity).unwrap();
    let occupancy: Arc<Vec<AtomicUsize>> =
        Arc::new((0..=capacity).map(|_| AtomicUsize::new(0)).collect());
    let active = Arc::new(AtomicUsize::new(0));
    let shared_slot = Arc::new(AtomicBool::new(false));
    let overflow = Arc::new(AtomicBool::new(false));

    let job: JobRef<Mutex<oneshot::Receiver<usize>>, ()> = {
        let occupancy = Arc::clone(&occupancy);
        let active = Arc::clone(&active);
        let shared_slot = Arc::clone(&shared_slot);
        let overflow = Arc::clone(&overflow);
        JobFn::arc("counted", move |io: SlotInput, _ctx: CancellationToken| {
            let occupancy = Arc::clone(&occupancy);
            let active = Arc::clone(&active);
            let shared_slot = Arc::clone(&shared_slot);
            let overflow = Arc::clone(&overflow);
            async move {
                let slot = {
                    let mut rx = io.input().lock().await;
                    (&mut *rx)
                        .await
                        .map_err(|e| JobError::fail(e.to_string()))?
                };
                if occupancy[slot].fetch_add(1, Ordering::SeqCst) != 0 {
                    shared_slot.store(true, Ordering::SeqCst);
                }
                if active.fetch_add(1, Ordering::SeqCst) + 1 > capacity {
                    overflow.store(true, Ordering::SeqCst);
                }
                sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
                occupancy[slot].fetch_sub(1, Ordering::SeqCst);
                Ok::<_, JobError>(())
            }
        })
    };

    let mut submitters = Vec::new();
    for _ in 0..submissions {
        let queue = Arc::clone(&queue);
        let job = Arc::clone(&job);
        submitters.push(tokio::spawn(async move {
            let (tx, rx) = oneshot::channel();
            let slot = queue
                .insert(job, IoEnvelope::new(Mutex::new(rx), ()), None)
                .await?;
            tx.send(slot.get()).expect("job waits for its slot");
            Ok::<_, QueueError>(slot)
        }));
    }
    for s in submitters {
        let slot = s.await.unwrap().unwrap();
        assert!((1..=capacity).contains(&slot.get()));
    }
    queue.drain(Duration::from_secs(5)).await.unwrap();

    assert!(!shared_slot.load(Ordering::SeqCst), "two jobs shared a slot");
    assert!(!overflow.load(Ordering::SeqCst));
    assert!(occupancy.iter().all(|c| c.load(Ordering::SeqCst) == 0));
    assert_eq!(active.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn huge_timeout_behaves_like_no_timeout() {
    let queue = WorkQueue::init(1).unwrap();
    let mut rx = queue.subscribe();

    let short: JobRef<(), ()> = JobFn::arc("short", |_io: Unit, _ctx: CancellationToken| async move {
        sleep(Duration::from_millis(50)).await;
        Ok::<_, JobError>(())
    });
    let slot = queue
        .insert(short, unit(), Some(Duration::MAX))
        .await
        .unwrap();

    let done = wait_for(&mut rx, |e| e.is_job_terminal()).await;
    assert_eq!(done.kind, EventKind::JobCompleted);
    assert_eq!(done.slot, Some(slot.get()));
    wait_for(&mut rx, |e| e.kind == EventKind::SlotReleased).await;
    assert!(queue.busy_slots().is_empty());
}

#[tokio::test]
async fn try_insert_never_waits() {
    let queue = WorkQueue::init(1).unwrap();
    let slot = queue.try_insert(blocking(), unit(), None).unwrap();
    assert_eq!(slot.get(), 1);

    assert!(matches!(
        queue.try_insert(instant(), unit(), None),
        Err(QueueError::Saturated)
    ));

    queue.shutdown();
    assert!(matches!(
        queue.try_insert(instant(), unit(), None),
        Err(QueueError::Closed)
    ));
}

#[tokio::test]
async fn panicking_job_does_not_poison_its_slot() {
    let queue = WorkQueue::init(1).unwrap();
    let mut rx = queue.subscribe();

    let boom: JobRef<(), ()> = JobFn::arc("boom", |_io: Unit, _ctx: CancellationToken| async move {
        if true {
            panic!("job exploded");
        }
        Ok::<_, JobError>(())
    });
    queue.insert(boom, unit(), None).await.unwrap();

    let ev = wait_for(&mut rx, |e| e.kind == EventKind::JobPanicked).await;
    assert_eq!(ev.reason_text(), "job exploded");

    let slot = queue.insert(instant(), unit(), None).await.unwrap();
    assert_eq!(slot.get(), 1);
    wait_for(&mut rx, |e| {
        e.kind == EventKind::JobCompleted && e.job_name() == "instant"
    })
    .await;
}

#[tokio::test]
async fn failing_job_is_reported_not_retried() {
    let queue = WorkQueue::init(1).unwrap();
    let mut rx = queue.subscribe();
    let runs = Arc::new(AtomicUsize::new(0));

    let job: JobRef<(), ()> = {
        let runs = Arc::clone(&runs);
        JobFn::arc("flaky", move |_io: Unit, _ctx: CancellationToken| {
            let runs = Arc::clone(&runs);
            async move {
                runs.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(JobError::fail("upstream unavailable"))
            }
        })
    };
    queue.insert(job, unit(), None).await.unwrap();

    let ev = wait_for(&mut rx, |e| e.kind == EventKind::JobFailed).await;
    assert!(ev.reason_text().contains("upstream unavailable"));
    queue.drain(Duration::from_secs(1)).await.unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
}

#[derive(Default)]
struct TimeoutCounter(AtomicUsize);

#[async_trait]
impl Subscribe for TimeoutCounter {
    async fn on_event(&self, ev: &Event) {
        if ev.kind == EventKind::TimeoutHit {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn name(&self) -> &'static str {
        "timeout-counter"
    }
}

#[tokio::test]
async fn subscribers_observe_timeouts() {
    let counter = Arc::new(TimeoutCounter::default());
    let subs: Vec<Arc<dyn Subscribe>> = vec![counter.clone()];
    let queue = WorkQueue::builder(QueueConfig::with_capacity(3))
        .with_subscribers(subs)
        .build()
        .unwrap();

    for _ in 0..3 {
        queue
            .insert(cooperative(), unit(), Some(Duration::from_millis(10)))
            .await
            .unwrap();
    }
    queue.drain(Duration::from_secs(2)).await.unwrap();

    timeout(Duration::from_secs(2), async {
        while counter.0.load(Ordering::SeqCst) < 3 {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("three timeouts observed");
}
