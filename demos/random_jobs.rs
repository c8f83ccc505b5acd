//! # Example: random_jobs
//!
//! Submits jobs with random input to a 10-slot queue until interrupted.
//!
//! Shows how to:
//! - Build a queue with the [`LogWriter`] subscriber
//! - Submit jobs with a 100ms timeout, one I/O envelope per job
//! - Report how many jobs were still running at shutdown
//!
//! ## Flow
//! ```text
//! main()
//!   ├─► WorkQueue::builder(capacity = 10).with_subscribers([LogWriter]).build()
//!   └─► loop until Ctrl-C
//!         ├─► input = rand(0..0xffff) ─► insert(echo, io, 100ms)
//!         ├─► sleep rand(0..500ms)
//!         ├─► input = rand(0..0xff)   ─► insert(echo, io, 100ms)
//!         └─► sleep 100ms
//!   shutdown() ─► print busy count
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=slotvisor=debug cargo run --example random_jobs
//! ```

use std::{sync::Arc, time::Duration};

use rand::Rng;
use slotvisor::{
    IoEnvelope, JobError, JobFn, JobRef, LogWriter, QueueConfig, QueueError, Subscribe,
    WorkQueue,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const TIMEOUT: Duration = Duration::from_millis(100);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("slotvisor=info")),
        )
        .init();

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let queue = WorkQueue::builder(QueueConfig::with_capacity(10))
        .with_subscribers(subs)
        .build()?;

    // Prints the input and stores the printed length.
    let echo: JobRef<u32, usize> = JobFn::arc(
        "echo",
        |io: IoEnvelope<u32, usize>, _ctx: CancellationToken| async move {
            let line = format!("Received input: {}", io.input());
            println!("{line}");
            *io.output().lock().await = line.len();
            Ok::<_, JobError>(())
        },
    );

    tokio::select! {
        res = submit_forever(&queue, echo) => res?,
        _ = tokio::signal::ctrl_c() => {}
    }

    println!("Ongoing jobs: {}", queue.shutdown());
    Ok(())
}

async fn submit_forever(queue: &WorkQueue, echo: JobRef<u32, usize>) -> Result<(), QueueError> {
    loop {
        let (first, pause, second) = {
            let mut rng = rand::thread_rng();
            (
                rng.gen_range(0..0xffff),
                rng.gen_range(0..500),
                rng.gen_range(0..0xff),
            )
        };

        let slot = queue
            .insert(Arc::clone(&echo), IoEnvelope::new(first, 0), Some(TIMEOUT))
            .await?;
        println!("Setting up job 1: {slot}");
        tokio::time::sleep(Duration::from_millis(pause)).await;

        let slot = queue
            .insert(Arc::clone(&echo), IoEnvelope::new(second, 0), Some(TIMEOUT))
            .await?;
        println!("Setting up job 2: {slot}");
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}
