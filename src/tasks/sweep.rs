//! Expiry Sweep Task
//!
//! Background task that periodically removes expired entries, so keys that
//! are never read again do not keep their files on disk forever.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::blocking::{run_blocking, SharedCache};

/// Spawns a background task that periodically purges expired entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Each sweep runs on the blocking pool while holding the
/// cache lock.
///
/// # Arguments
/// * `cache` - shared reference to the cache facade
/// * `interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
pub fn spawn_sweep_task(cache: SharedCache, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting expiry sweep task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            match run_blocking(&cache, |c| c.purge_expired()).await {
                Ok(0) => debug!("Expiry sweep: no expired entries found"),
                Ok(removed) => info!("Expiry sweep: removed {} expired entries", removed),
                Err(e) => warn!("Expiry sweep failed: {}", e),
            }
        }
    })
}
