//! Response DTOs for the cache server API
//!
//! Defines the structure of outgoing HTTP response bodies.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::cache::{CacheStats, Value};

/// Response body for the GET operation (GET /get/:key)
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: Value,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Response body for the batch GET operation (POST /get)
///
/// Missing keys map to `null`.
#[derive(Debug, Clone, Serialize)]
pub struct GetManyResponse {
    pub values: BTreeMap<String, Option<Value>>,
}

/// Response body for the SET and REPLACE operations
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    /// Success message
    pub message: String,
    /// The key that was written
    pub key: String,
}

impl SetResponse {
    pub fn stored(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' set successfully", key),
            key,
        }
    }

    pub fn replaced(key: impl Into<String>) -> Self {
        let key = key.into();
        Self {
            message: format!("Key '{}' replaced successfully", key),
            key,
        }
    }
}

/// Response body for the DELETE operation (DELETE /del/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    /// The key that was deleted
    pub key: String,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, timeout: u64) -> Self {
        let key = key.into();
        let message = if timeout > 0 {
            format!("Key '{}' expires in {} seconds", key, timeout)
        } else {
            format!("Key '{}' deleted successfully", key)
        };
        Self { message, key }
    }
}

/// Response body for the counter operations (POST /incr/:key, POST /decr/:key)
#[derive(Debug, Clone, Serialize)]
pub struct CounterResponse {
    pub key: String,
    pub value: i64,
}

/// Response body for POST /flush
#[derive(Debug, Clone, Serialize)]
pub struct FlushResponse {
    pub flushed: bool,
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Backend name
    pub backend: String,
    /// Number of backend instances opened on the store
    pub connections: u64,
    /// Bytes of stored data
    pub size: u64,
    /// Number of writes
    pub sets: u64,
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses
    pub failures: u64,
    /// Hit rate (hits / (hits + failures))
    pub hit_rate: f64,
}

impl StatsResponse {
    pub fn new(backend: impl Into<String>, stats: &CacheStats) -> Self {
        Self {
            backend: backend.into(),
            connections: stats.connections,
            size: stats.size,
            sets: stats.sets,
            hits: stats.hits,
            failures: stats.failures,
            hit_rate: stats.hit_rate(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
