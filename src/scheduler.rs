//! Background scheduler for the update cycle.
//!
//! The loop runs a cycle, waits for it to finish, then sleeps for the
//! configured interval. Cycles never overlap; a cycle that overruns the
//! interval simply delays the next one. There is no timeout on a cycle: a
//! hung sysfs read stalls the loop until it returns.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::state::SharedState;

/// Sleeps for `interval` unless shutdown is requested first.
///
/// Returns `true` when the scheduler should stop.
async fn wait_or_shutdown(interval: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    let sleep = tokio::time::sleep(interval);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return false,
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    return true;
                }
            }
        }
    }
}

/// Runs update cycles forever, or until `shutdown` turns `true`.
pub async fn run_scheduler(
    state: SharedState,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(
        "Update scheduler started: {} device(s), interval {:?}",
        state.devices().len(),
        interval
    );

    loop {
        if *shutdown.borrow() {
            break;
        }

        let updater = state.updater.clone();
        match tokio::task::spawn_blocking(move || updater.run_cycle()).await {
            Ok(report) => state.record_cycle(&report),
            Err(e) => {
                error!("Update cycle task failed: {}", e);
                state.health_stats.record_cycle_crash();
            }
        }

        if wait_or_shutdown(interval, &mut shutdown).await {
            break;
        }
    }

    info!("Update scheduler stopped");
}

/// Spawns [`run_scheduler`] on the current runtime.
pub fn spawn_scheduler(
    state: SharedState,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(run_scheduler(state, interval, shutdown))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_returns_after_interval() {
        let (_tx, mut rx) = watch::channel(false);
        assert!(!wait_or_shutdown(Duration::from_millis(5), &mut rx).await);
    }

    #[tokio::test]
    async fn test_wait_stops_on_shutdown() {
        let (tx, mut rx) = watch::channel(false);
        let waiter =
            tokio::spawn(async move { wait_or_shutdown(Duration::from_secs(60), &mut rx).await });
        tx.send(true).unwrap();
        assert!(waiter.await.unwrap());
    }

    #[tokio::test]
    async fn test_wait_ignores_false_updates() {
        let (tx, mut rx) = watch::channel(false);
        let waiter = tokio::spawn(async move {
            let start = std::time::Instant::now();
            let stopped = wait_or_shutdown(Duration::from_millis(50), &mut rx).await;
            (stopped, start.elapsed())
        });
        tx.send(false).unwrap();
        let (stopped, elapsed) = waiter.await.unwrap();
        assert!(!stopped);
        assert!(elapsed >= Duration::from_millis(50));
    }
}
