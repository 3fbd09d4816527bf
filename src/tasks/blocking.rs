//! Blocking Cache Access
//!
//! Backends do synchronous filesystem I/O and may sleep while waiting for
//! the stats log lock. Every call into the shared facade goes through
//! [`run_blocking`] so that work lands on tokio's blocking pool instead of
//! an executor thread.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::cache::Cache;
use crate::error::{CacheError, Result};

/// The cache facade as shared by request handlers and background tasks.
pub type SharedCache = Arc<Mutex<Cache>>;

pub fn shared(cache: Cache) -> SharedCache {
    Arc::new(Mutex::new(cache))
}

/// Locks the facade, recovering it from a poisoned lock.
pub fn lock(cache: &Mutex<Cache>) -> MutexGuard<'_, Cache> {
    cache.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs `op` with exclusive access to the facade on the blocking pool.
pub async fn run_blocking<T, F>(cache: &SharedCache, op: F) -> Result<T>
where
    F: FnOnce(&mut Cache) -> T + Send + 'static,
    T: Send + 'static,
{
    let cache = Arc::clone(cache);
    tokio::task::spawn_blocking(move || op(&mut lock(&cache)))
        .await
        .map_err(|e| CacheError::Task(e.to_string()))
}
