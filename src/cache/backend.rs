//! Cache Backend Module
//!
//! The contract every storage medium implements. Backends expose single-key
//! operations; the batch variants fan out per key and collect the results
//! keyed exactly like the input.

use std::collections::BTreeMap;

use crate::cache::{CacheStats, Compression, Expiration, Value};

// == Cache Backend ==
/// A concrete storage medium behind the [`Cache`](crate::cache::Cache) facade.
///
/// Steady-state failures never surface as errors: a read that cannot be
/// served is a miss (`None`), a write that cannot be performed is `None` or
/// `false`.
pub trait CacheBackend: Send + Sync {
    /// Returns the stored value, or `None` on a miss.
    fn get(&mut self, key: &str, compression: Compression) -> Option<Value>;

    /// Stores a value only if the key is absent. Returns the stored value.
    fn set(
        &mut self,
        key: &str,
        value: Value,
        expiration: &Expiration,
        compression: Compression,
    ) -> Option<Value>;

    /// Stores a value whether or not the key is present.
    fn replace(
        &mut self,
        key: &str,
        value: Value,
        expiration: &Expiration,
        compression: Compression,
    ) -> Option<Value>;

    /// Removes a key, or with a nonzero `timeout` (seconds) lets it expire
    /// that long from now instead. Returns whether the key was present.
    fn delete(&mut self, key: &str, timeout: u64) -> bool;

    /// Adds `amount` to a counter. A missing key starts from zero. The
    /// counter is read and written back with `compression`.
    fn increment(&mut self, key: &str, amount: i64, compression: Compression) -> Option<i64>;

    /// Subtracts `amount` from a counter. A missing key starts from zero.
    fn decrement(&mut self, key: &str, amount: i64, compression: Compression) -> Option<i64>;

    /// Drops every stored key.
    fn flush(&mut self) -> bool;

    fn stats(&self) -> CacheStats;

    fn name(&self) -> &'static str;

    /// Reclaims storage held by expired entries. Returns how many were removed.
    fn purge_expired(&mut self) -> usize {
        0
    }

    // == Batch Operations ==
    fn get_many(&mut self, keys: &[&str], compression: Compression) -> BTreeMap<String, Option<Value>> {
        keys.iter()
            .map(|key| (key.to_string(), self.get(key, compression)))
            .collect()
    }

    fn set_many(
        &mut self,
        values: BTreeMap<String, Value>,
        expiration: &Expiration,
        compression: Compression,
    ) -> BTreeMap<String, Option<Value>> {
        values
            .into_iter()
            .map(|(key, value)| {
                let stored = self.set(&key, value, expiration, compression);
                (key, stored)
            })
            .collect()
    }

    fn replace_many(
        &mut self,
        values: BTreeMap<String, Value>,
        expiration: &Expiration,
        compression: Compression,
    ) -> BTreeMap<String, Option<Value>> {
        values
            .into_iter()
            .map(|(key, value)| {
                let stored = self.replace(&key, value, expiration, compression);
                (key, stored)
            })
            .collect()
    }

    fn delete_many(&mut self, keys: &[&str], timeout: u64) -> BTreeMap<String, bool> {
        keys.iter()
            .map(|key| (key.to_string(), self.delete(key, timeout)))
            .collect()
    }

    fn increment_many(
        &mut self,
        keys: &[&str],
        amount: i64,
        compression: Compression,
    ) -> BTreeMap<String, Option<i64>> {
        keys.iter()
            .map(|key| (key.to_string(), self.increment(key, amount, compression)))
            .collect()
    }

    fn decrement_many(
        &mut self,
        keys: &[&str],
        amount: i64,
        compression: Compression,
    ) -> BTreeMap<String, Option<i64>> {
        keys.iter()
            .map(|key| (key.to_string(), self.decrement(key, amount, compression)))
            .collect()
    }
}

/// Shared read-modify-write for counters.
///
/// The current value is read, adjusted and written back with `replace`.
/// Nothing locks the key in between, so concurrent adjustments of the same
/// key from several processes can lose updates. Non-numeric values count as
/// zero. The result never expires.
pub(crate) fn adjust_counter<B: CacheBackend + ?Sized>(
    backend: &mut B,
    key: &str,
    delta: i64,
    compression: Compression,
) -> Option<i64> {
    let stored = match backend.get(key, compression) {
        Some(current) => {
            let next = current.as_integer().unwrap_or(0).saturating_add(delta);
            backend.replace(key, Value::Int(next), &Expiration::Never, compression)
        }
        None => backend.set(key, Value::Int(delta), &Expiration::Never, compression),
    };
    stored.and_then(|value| value.as_integer())
}
