//! Cache Statistics Module
//!
//! Aggregate counters reported by every backend.

use serde::Serialize;

// == Cache Stats ==
/// Cache counters: connections, writes, reads (hits) and failures (misses),
/// plus the byte size of stored data where the backend can measure it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Number of backend instances opened on this store
    pub connections: u64,
    /// Bytes of stored data
    pub size: u64,
    /// Number of successful writes
    pub sets: u64,
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub failures: u64,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + failures), or 0.0 if no reads have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.failures;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_connection(&mut self) {
        self.connections += 1;
    }

    pub fn record_write(&mut self) {
        self.sets += 1;
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_failure(&mut self) {
        self.failures += 1;
    }
}
