//! Repeated passes until interrupted.

use std::io;
use std::time::Duration;

use tokio::sync::watch;

use crate::models::CheckpointState;
use crate::pipeline::SyncEngine;

/// Shortest pause allowed between passes.
pub const MIN_INTERVAL: Duration = Duration::from_secs(60);

/// Pause between passes for a configured interval.
pub fn pass_interval(interval_secs: u64) -> Duration {
    Duration::from_secs(interval_secs).max(MIN_INTERVAL)
}

/// Listen for Ctrl-C. The receiver flips to `true` once it arrives.
///
/// Must be called inside a Tokio runtime.
pub fn shutdown_signal() -> watch::Receiver<bool> {
    shutdown_on(tokio::signal::ctrl_c())
}

/// Flip the receiver to `true` when `signal` completes successfully.
///
/// If the listener cannot be installed the receiver never flips, so the
/// daemon keeps running instead of stopping after one pass.
fn shutdown_on<F>(signal: F) -> watch::Receiver<bool>
where
    F: Future<Output = io::Result<()>> + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal.await {
            Ok(()) => {
                log::info!("Interrupt received, stopping after the current pass");
                let _ = tx.send(true);
            }
            Err(e) => {
                log::error!("Cannot listen for interrupts, running until killed: {}", e);
                std::future::pending::<()>().await;
                drop(tx);
            }
        }
    });
    rx
}

/// Run passes every `interval` until `shutdown` turns `true`.
///
/// A pass in progress always finishes; the signal is checked between passes
/// and wakes the pause early. Returns the number of passes run.
pub async fn run_daemon(
    engine: &SyncEngine,
    accounts: &[String],
    state: &mut CheckpointState,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> usize {
    let mut passes = 0;

    loop {
        engine.run_pass(accounts, state).await;
        passes += 1;

        if *shutdown.borrow() {
            break;
        }

        log::debug!("Sleeping {}s until next pass", interval.as_secs());
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    log::info!("Exiting after {} passes", passes);
    passes
}
