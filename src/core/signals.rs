//! # Termination signals for [`WorkQueue::run_until_signal`](crate::WorkQueue::run_until_signal).
//!
//! **Unix:** `SIGINT`, `SIGTERM`, `SIGQUIT`.
//! **Elsewhere:** `Ctrl-C` via [`tokio::signal::ctrl_c`].

/// Completes on the first termination signal.
///
/// Listeners are installed per call; an `Err` means installation failed.
#[cfg(unix)]
pub(crate) async fn wait_for_termination() -> std::io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv() => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Completes on the first termination signal.
#[cfg(not(unix))]
pub(crate) async fn wait_for_termination() -> std::io::Result<()> {
    tokio::signal::ctrl_c().await
}
