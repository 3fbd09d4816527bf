//! phy_cache - A file-backed key/value cache with a pluggable backend facade
//!
//! Values are stored one file per key with optional expiration and zlib
//! compression; usage statistics are kept in an append-only event log.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::spawn_sweep_task;
