//! Cache Facade Module
//!
//! The object application code talks to. It owns one backend, prefixes every
//! key and fills in the default expiration and compression when the caller
//! leaves them out.

use std::collections::BTreeMap;
use std::fmt;

use tracing::info;

use crate::cache::{
    CacheBackend, CacheStats, Compression, DiskCache, Expiration, MemoryCache, NullCache, Value,
};
use crate::config::{BackendKind, Config};
use crate::error::Result;

/// Default expiration applied by the facade: five minutes.
pub const DEFAULT_EXPIRATION_SECS: u64 = 300;

/// Builds the backend selected by the configuration.
pub fn build_backend(config: &Config) -> Result<Box<dyn CacheBackend>> {
    let backend: Box<dyn CacheBackend> = match config.backend {
        BackendKind::Disk => Box::new(DiskCache::new(&config.location)?),
        BackendKind::Memory => Box::new(MemoryCache::new()),
        BackendKind::None => Box::new(NullCache::new()),
    };
    info!("Using {} cache backend", backend.name());
    Ok(backend)
}

// == Cache ==
pub struct Cache {
    client: Box<dyn CacheBackend>,
    prefix: String,
    expiration: Expiration,
    compression: Compression,
}

impl Cache {
    // == Constructor ==
    pub fn new(client: Box<dyn CacheBackend>) -> Self {
        Self {
            client,
            prefix: String::new(),
            expiration: Expiration::seconds(DEFAULT_EXPIRATION_SECS),
            compression: Compression::None,
        }
    }

    pub fn with_backend<B: CacheBackend + 'static>(backend: B) -> Self {
        Self::new(Box::new(backend))
    }

    /// Builds the configured backend and applies prefix and defaults.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut cache = Self::new(build_backend(config)?);
        cache
            .set_prefix(config.prefix.clone())
            .set_expiration(config.default_expiration.clone())
            .set_compression(config.compression);
        Ok(cache)
    }

    // == Settings ==
    pub fn set_prefix(&mut self, prefix: impl Into<String>) -> &mut Self {
        self.prefix = prefix.into();
        self
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_expiration(&mut self, expiration: Expiration) -> &mut Self {
        self.expiration = expiration;
        self
    }

    pub fn expiration(&self) -> &Expiration {
        &self.expiration
    }

    pub fn set_compression(&mut self, compression: Compression) -> &mut Self {
        self.compression = compression;
        self
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    pub fn client(&self) -> &dyn CacheBackend {
        self.client.as_ref()
    }

    fn key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn keys(&self, keys: &[&str]) -> Vec<String> {
        keys.iter().map(|key| self.key(key)).collect()
    }

    /// Maps backend results keyed by full keys back to caller keys.
    fn strip<T>(&self, results: BTreeMap<String, T>) -> BTreeMap<String, T> {
        results
            .into_iter()
            .map(|(key, value)| {
                let key = match key.strip_prefix(self.prefix.as_str()) {
                    Some(stripped) => stripped.to_string(),
                    None => key,
                };
                (key, value)
            })
            .collect()
    }

    fn prefixed<T>(&self, values: BTreeMap<String, T>) -> BTreeMap<String, T> {
        values
            .into_iter()
            .map(|(key, value)| (self.key(&key), value))
            .collect()
    }

    // == Single Key Operations ==
    pub fn get(&mut self, key: &str, compression: Option<Compression>) -> Option<Value> {
        let compression = compression.unwrap_or(self.compression);
        let key = self.key(key);
        self.client.get(&key, compression)
    }

    pub fn set(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        expiration: Option<Expiration>,
        compression: Option<Compression>,
    ) -> Option<Value> {
        let expiration = expiration.unwrap_or_else(|| self.expiration.clone());
        let compression = compression.unwrap_or(self.compression);
        let key = self.key(key);
        self.client.set(&key, value.into(), &expiration, compression)
    }

    pub fn replace(
        &mut self,
        key: &str,
        value: impl Into<Value>,
        expiration: Option<Expiration>,
        compression: Option<Compression>,
    ) -> Option<Value> {
        let expiration = expiration.unwrap_or_else(|| self.expiration.clone());
        let compression = compression.unwrap_or(self.compression);
        let key = self.key(key);
        self.client
            .replace(&key, value.into(), &expiration, compression)
    }

    pub fn delete(&mut self, key: &str, timeout: u64) -> bool {
        let key = self.key(key);
        self.client.delete(&key, timeout)
    }

    pub fn increment(&mut self, key: &str, amount: i64) -> Option<i64> {
        let key = self.key(key);
        self.client.increment(&key, amount, self.compression)
    }

    pub fn decrement(&mut self, key: &str, amount: i64) -> Option<i64> {
        let key = self.key(key);
        self.client.decrement(&key, amount, self.compression)
    }

    pub fn flush(&mut self) -> bool {
        self.client.flush()
    }

    pub fn stats(&self) -> CacheStats {
        self.client.stats()
    }

    pub fn name(&self) -> &'static str {
        self.client.name()
    }

    pub fn purge_expired(&mut self) -> usize {
        self.client.purge_expired()
    }

    // == Batch Operations ==
    pub fn get_many(
        &mut self,
        keys: &[&str],
        compression: Option<Compression>,
    ) -> BTreeMap<String, Option<Value>> {
        let compression = compression.unwrap_or(self.compression);
        let keys = self.keys(keys);
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let results = self.client.get_many(&keys, compression);
        self.strip(results)
    }

    pub fn set_many(
        &mut self,
        values: BTreeMap<String, Value>,
        expiration: Option<Expiration>,
        compression: Option<Compression>,
    ) -> BTreeMap<String, Option<Value>> {
        let expiration = expiration.unwrap_or_else(|| self.expiration.clone());
        let compression = compression.unwrap_or(self.compression);
        let values = self.prefixed(values);
        let results = self.client.set_many(values, &expiration, compression);
        self.strip(results)
    }

    pub fn replace_many(
        &mut self,
        values: BTreeMap<String, Value>,
        expiration: Option<Expiration>,
        compression: Option<Compression>,
    ) -> BTreeMap<String, Option<Value>> {
        let expiration = expiration.unwrap_or_else(|| self.expiration.clone());
        let compression = compression.unwrap_or(self.compression);
        let values = self.prefixed(values);
        let results = self.client.replace_many(values, &expiration, compression);
        self.strip(results)
    }

    pub fn delete_many(&mut self, keys: &[&str], timeout: u64) -> BTreeMap<String, bool> {
        let keys = self.keys(keys);
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let results = self.client.delete_many(&keys, timeout);
        self.strip(results)
    }

    pub fn increment_many(&mut self, keys: &[&str], amount: i64) -> BTreeMap<String, Option<i64>> {
        let keys = self.keys(keys);
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let results = self.client.increment_many(&keys, amount, self.compression);
        self.strip(results)
    }

    pub fn decrement_many(&mut self, keys: &[&str], amount: i64) -> BTreeMap<String, Option<i64>> {
        let keys = self.keys(keys);
        let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
        let results = self.client.decrement_many(&keys, amount, self.compression);
        self.strip(results)
    }
}

impl fmt::Debug for Cache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("client", &self.client.name())
            .field("prefix", &self.prefix)
            .field("expiration", &self.expiration)
            .field("compression", &self.compression)
            .finish()
    }
}
