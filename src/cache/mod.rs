//! Cache Module
//!
//! Cache backends behind a common trait, the disk engine with its node
//! format and stats log, and the facade that applies prefix and defaults.

mod backend;
mod disk;
mod expiration;
mod facade;
mod key_mapper;
mod memory;
mod node;
mod null;
mod stats;
mod stats_log;
mod value;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use backend::CacheBackend;
pub use disk::DiskCache;
pub use expiration::Expiration;
pub use facade::{build_backend, Cache, DEFAULT_EXPIRATION_SECS};
pub use key_mapper::{digest, KeyMapper, CACHE_EXTENSION};
pub use memory::MemoryCache;
pub use node::Node;
pub use null::NullCache;
pub use stats::CacheStats;
pub use stats_log::{StatEvent, StatsLog, STATS_LOG_NAME};
pub use value::{Compression, Value};

// == Public Constants ==
/// Maximum allowed key length in bytes (the memcached limit)
pub const MAX_KEY_LENGTH: usize = 250;
