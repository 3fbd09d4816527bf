//! Memory Cache Module
//!
//! Process-local backend. Data lives until the process exits or the cache is
//! flushed; nothing is persisted.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::backend::adjust_counter;
use crate::cache::{CacheBackend, CacheStats, Compression, Expiration, Node, Value};

#[derive(Debug)]
struct Slot {
    node: Node,
    compression: Compression,
}

// == Memory Cache ==
/// HashMap-backed cache with the same contract as the disk backend.
#[derive(Debug)]
pub struct MemoryCache {
    entries: HashMap<String, Slot>,
    stats: CacheStats,
}

impl MemoryCache {
    // == Constructor ==
    pub fn new() -> Self {
        let mut stats = CacheStats::new();
        stats.record_connection();
        Self {
            entries: HashMap::new(),
            stats,
        }
    }

    /// Number of stored nodes, expired ones included until they are touched.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for MemoryCache {
    // == Get ==
    /// Returns the value if present and live. Expired nodes are removed and
    /// counted as misses.
    fn get(&mut self, key: &str, compression: Compression) -> Option<Value> {
        if self
            .entries
            .get(key)
            .is_some_and(|slot| slot.node.has_expired())
        {
            self.entries.remove(key);
        }

        let value = self
            .entries
            .get(key)
            .filter(|slot| slot.compression == compression)
            .map(|slot| slot.node.content().clone());

        match value {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_failure(),
        }
        value
    }

    // == Set ==
    fn set(
        &mut self,
        key: &str,
        value: Value,
        expiration: &Expiration,
        compression: Compression,
    ) -> Option<Value> {
        if let Some(slot) = self.entries.get(key) {
            if !slot.node.has_expired() {
                return None;
            }
        }

        let node = match Node::new(key, value, expiration) {
            Ok(node) => node,
            Err(e) => {
                debug!("Cannot store key '{}': {}", key, e);
                return None;
            }
        };
        let stored = node.content().clone();
        self.entries
            .insert(key.to_string(), Slot { node, compression });
        self.stats.record_write();
        Some(stored)
    }

    fn replace(
        &mut self,
        key: &str,
        value: Value,
        expiration: &Expiration,
        compression: Compression,
    ) -> Option<Value> {
        self.entries.remove(key);
        self.set(key, value, expiration, compression)
    }

    // == Delete ==
    fn delete(&mut self, key: &str, timeout: u64) -> bool {
        if timeout > 0 {
            let compression = match self.entries.get(key) {
                Some(slot) => slot.compression,
                None => return false,
            };
            return match self.get(key, compression) {
                Some(value) => self
                    .replace(key, value, &Expiration::seconds(timeout), compression)
                    .is_some(),
                None => false,
            };
        }
        self.entries.remove(key).is_some()
    }

    fn increment(&mut self, key: &str, amount: i64, compression: Compression) -> Option<i64> {
        adjust_counter(self, key, amount, compression)
    }

    fn decrement(&mut self, key: &str, amount: i64, compression: Compression) -> Option<i64> {
        adjust_counter(self, key, amount.saturating_neg(), compression)
    }

    // == Flush ==
    /// Returns whether anything was dropped.
    fn flush(&mut self) -> bool {
        let count = self.entries.len();
        self.entries.clear();
        count > 0
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.size = self
            .entries
            .values()
            .filter(|slot| !slot.node.has_expired())
            .filter_map(|slot| slot.node.to_bytes().ok())
            .map(|bytes| bytes.len() as u64)
            .sum();
        stats
    }

    fn name(&self) -> &'static str {
        "Local"
    }

    // == Purge Expired ==
    fn purge_expired(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, slot| !slot.node.has_expired());
        before - self.entries.len()
    }
}
