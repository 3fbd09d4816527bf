//! Configuration Module
//!
//! Handles loading and managing cache and server configuration from
//! environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::cache::{Compression, Expiration, DEFAULT_EXPIRATION_SECS};
use crate::error::CacheError;

// == Backend Kind ==
/// Which backend the facade is built on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BackendKind {
    #[default]
    Disk,
    Memory,
    None,
}

impl FromStr for BackendKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "disk" => Ok(BackendKind::Disk),
            "memory" | "local" => Ok(BackendKind::Memory),
            "none" | "null" => Ok(BackendKind::None),
            other => Err(CacheError::Config(format!("Unknown cache backend '{other}'"))),
        }
    }
}

/// Cache and server configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend behind the facade
    pub backend: BackendKind,
    /// Directory used by the disk backend
    pub location: PathBuf,
    /// Prefix prepended to every key
    pub prefix: String,
    /// Expiration used when a write does not give one
    pub default_expiration: Expiration,
    /// Compression used when a call does not give one
    pub compression: Compression,
    /// HTTP server port
    pub server_port: u16,
    /// Expired-entry sweep interval in seconds, 0 disables the sweep
    pub sweep_interval: u64,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_BACKEND` - `disk`, `memory` or `none` (default: disk)
    /// - `CACHE_LOCATION` - Disk cache directory (default: ./cache)
    /// - `CACHE_PREFIX` - Key prefix (default: empty)
    /// - `CACHE_EXPIRATION` - Default ttl, seconds or relative time (default: 300)
    /// - `CACHE_COMPRESSION` - Compression flag, 0 for none (default: 0)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `SWEEP_INTERVAL` - Expired-entry sweep frequency in seconds (default: 60)
    pub fn from_env() -> Result<Self, CacheError> {
        let defaults = Self::default();
        Ok(Self {
            backend: match env::var("CACHE_BACKEND") {
                Ok(v) => v.parse()?,
                Err(_) => defaults.backend,
            },
            location: env::var("CACHE_LOCATION")
                .map(PathBuf::from)
                .unwrap_or(defaults.location),
            prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.prefix),
            default_expiration: env::var("CACHE_EXPIRATION")
                .map(|v| Expiration::parse(&v))
                .unwrap_or(defaults.default_expiration),
            compression: env::var("CACHE_COMPRESSION")
                .ok()
                .and_then(|v| v.trim().parse().ok())
                .map(Compression::from_flag)
                .unwrap_or(defaults.compression),
            server_port: env::var("SERVER_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.server_port),
            sweep_interval: env::var("SWEEP_INTERVAL")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.sweep_interval),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::Disk,
            location: PathBuf::from("./cache"),
            prefix: String::new(),
            default_expiration: Expiration::seconds(DEFAULT_EXPIRATION_SECS),
            compression: Compression::None,
            server_port: 3000,
            sweep_interval: 60,
        }
    }
}
