//! Null Cache Module
//!
//! Backend used when caching is disabled. Every read misses and every write
//! is refused.

use crate::cache::{CacheBackend, CacheStats, Compression, Expiration, Value};

#[derive(Debug, Default, Clone, Copy)]
pub struct NullCache;

impl NullCache {
    pub fn new() -> Self {
        Self
    }
}

impl CacheBackend for NullCache {
    fn get(&mut self, _key: &str, _compression: Compression) -> Option<Value> {
        None
    }

    fn set(
        &mut self,
        _key: &str,
        _value: Value,
        _expiration: &Expiration,
        _compression: Compression,
    ) -> Option<Value> {
        None
    }

    fn replace(
        &mut self,
        _key: &str,
        _value: Value,
        _expiration: &Expiration,
        _compression: Compression,
    ) -> Option<Value> {
        None
    }

    fn delete(&mut self, _key: &str, _timeout: u64) -> bool {
        false
    }

    fn increment(&mut self, _key: &str, _amount: i64, _compression: Compression) -> Option<i64> {
        None
    }

    fn decrement(&mut self, _key: &str, _amount: i64, _compression: Compression) -> Option<i64> {
        None
    }

    fn flush(&mut self) -> bool {
        false
    }

    fn stats(&self) -> CacheStats {
        CacheStats::new()
    }

    fn name(&self) -> &'static str {
        "None"
    }
}
