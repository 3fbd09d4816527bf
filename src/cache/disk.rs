//! Disk Cache Module
//!
//! File-per-key cache engine. Each key lives in `directory/<digest>.cache` as
//! a serialized [`Node`], optionally zlib-compressed. Outcomes are appended to
//! the shared stats log next to the data files.
//!
//! Per key, the filesystem holds the state: no file means absent, a file with
//! a live node means present, a file with an expired node is logically
//! absent. Expired files are removed when a read or a write runs into them,
//! or by [`DiskCache::purge_expired`].

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::cache::backend::adjust_counter;
use crate::cache::{
    CacheBackend, CacheStats, Compression, Expiration, KeyMapper, Node, StatEvent, StatsLog,
    Value,
};
use crate::error::{CacheError, Result};

// == Disk Cache ==
#[derive(Debug)]
pub struct DiskCache {
    mapper: KeyMapper,
    stats: StatsLog,
}

impl DiskCache {
    // == Constructor ==
    /// Opens a disk cache in `location`, which must be an existing writable
    /// directory.
    pub fn new(location: impl Into<PathBuf>) -> Result<Self> {
        let location = location.into();

        let meta = fs::metadata(&location).map_err(|e| {
            CacheError::Config(format!(
                "Cache folder {} is not accessible: {}",
                location.display(),
                e
            ))
        })?;
        if !meta.is_dir() {
            return Err(CacheError::Config(format!(
                "Cache location {} is not a directory",
                location.display()
            )));
        }
        // Probe with a real file; permission bits alone do not tell.
        NamedTempFile::new_in(&location).map_err(|e| {
            CacheError::Config(format!(
                "Disk caching is disabled, {} is not writable: {}",
                location.display(),
                e
            ))
        })?;

        let cache = Self {
            mapper: KeyMapper::new(&location),
            stats: StatsLog::new(&location),
        };
        cache.stats.record(StatEvent::Connect);
        info!("Disk cache opened at {}", location.display());
        Ok(cache)
    }

    /// Opens a disk cache from a settings map. `location` is required.
    pub fn from_settings(settings: &HashMap<String, String>) -> Result<Self> {
        let location = settings
            .get("location")
            .ok_or_else(|| CacheError::Config("No folder set for disk caching".to_string()))?;
        Self::new(location)
    }

    pub fn location(&self) -> &Path {
        self.mapper.directory()
    }

    // == File Helpers ==
    fn read_node(&self, path: &Path, compression: Compression) -> Result<Option<Node>> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };
        let bytes = compression
            .decode(bytes)
            .map_err(|e| CacheError::Corrupt(format!("{}: {}", path.display(), e)))?;
        Node::from_bytes(&bytes).map(Some)
    }

    /// Writes through a temp file in the cache directory, then links it into
    /// place only if nothing is there yet. Returns false if another writer
    /// got there first.
    fn write_node(&self, path: &Path, node: &Node, compression: Compression) -> Result<bool> {
        let dir = self.mapper.directory();
        let bytes = compression
            .encode(node.to_bytes()?)
            .map_err(|e| CacheError::io(path, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| CacheError::io(dir, e))?;
        tmp.write_all(&bytes).map_err(|e| CacheError::io(dir, e))?;

        match tmp.persist_noclobber(path) {
            Ok(_) => Ok(true),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(CacheError::io(path, e.error)),
        }
    }

    /// Whether a write to `path` would clobber a live value. Expired files
    /// are removed on the way. Files that cannot be decoded in either
    /// encoding are left alone and count as occupied.
    fn is_occupied(&self, path: &Path) -> bool {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return false,
            Err(e) => {
                debug!("Cannot inspect {}: {}", path.display(), e);
                return path.exists();
            }
        };
        match decode_stored(bytes) {
            Some((node, _)) if node.has_expired() => {
                remove_quietly(path);
                false
            }
            _ => true,
        }
    }

    fn data_files(&self) -> io::Result<Vec<PathBuf>> {
        Ok(fs::read_dir(self.mapper.directory())?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| KeyMapper::is_data_file(path))
            .collect())
    }
}

impl CacheBackend for DiskCache {
    // == Get ==
    /// Reads the node for `key`. Expired nodes are a miss and their file is
    /// deleted.
    fn get(&mut self, key: &str, compression: Compression) -> Option<Value> {
        let path = self.mapper.locate(key);

        let value = match self.read_node(&path, compression) {
            Ok(Some(node)) if node.has_expired() => {
                debug!("Key '{}' expired, removing {}", key, path.display());
                remove_quietly(&path);
                None
            }
            Ok(Some(node)) => Some(node.into_content()),
            Ok(None) => None,
            Err(e) => {
                debug!("Treating unreadable key '{}' as a miss: {}", key, e);
                None
            }
        };

        match value {
            Some(_) => self.stats.record(StatEvent::Read),
            None => self.stats.record(StatEvent::Failure),
        }
        value
    }

    // == Set ==
    /// Stores `value` unless a live value is already stored for `key`.
    fn set(
        &mut self,
        key: &str,
        value: Value,
        expiration: &Expiration,
        compression: Compression,
    ) -> Option<Value> {
        let path = self.mapper.locate(key);
        if self.is_occupied(&path) {
            debug!("Key '{}' already stored, set refused", key);
            return None;
        }

        let node = match Node::new(key, value, expiration) {
            Ok(node) => node,
            Err(e) => {
                warn!("Cannot store key '{}': {}", key, e);
                return None;
            }
        };

        match self.write_node(&path, &node, compression) {
            Ok(true) => {
                self.stats.record(StatEvent::Write);
                Some(node.into_content())
            }
            Ok(false) => {
                debug!("Key '{}' was stored concurrently, set refused", key);
                None
            }
            Err(e) => {
                warn!("Cannot store key '{}': {}", key, e);
                None
            }
        }
    }

    // == Replace ==
    fn replace(
        &mut self,
        key: &str,
        value: Value,
        expiration: &Expiration,
        compression: Compression,
    ) -> Option<Value> {
        remove_quietly(&self.mapper.locate(key));
        self.set(key, value, expiration, compression)
    }

    // == Delete ==
    fn delete(&mut self, key: &str, timeout: u64) -> bool {
        let path = self.mapper.locate(key);

        if timeout > 0 {
            // Reschedule with whatever encoding the value was stored in
            let compression = match fs::read(&path).ok().and_then(decode_stored) {
                Some((_, compression)) => compression,
                None => return false,
            };
            return match self.get(key, compression) {
                Some(value) => self
                    .replace(key, value, &Expiration::seconds(timeout), compression)
                    .is_some(),
                None => false,
            };
        }

        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => {
                warn!("Cannot delete key '{}': {}", key, e);
                false
            }
        }
    }

    fn increment(&mut self, key: &str, amount: i64, compression: Compression) -> Option<i64> {
        adjust_counter(self, key, amount, compression)
    }

    fn decrement(&mut self, key: &str, amount: i64, compression: Compression) -> Option<i64> {
        adjust_counter(self, key, amount.saturating_neg(), compression)
    }

    // == Flush ==
    /// Deletes every data file. The stats log survives.
    fn flush(&mut self) -> bool {
        let files = match self.data_files() {
            Ok(files) => files,
            Err(e) => {
                warn!("Cannot flush {}: {}", self.location().display(), e);
                return false;
            }
        };
        let count = files.len();
        for path in files {
            remove_quietly(&path);
        }
        info!("Flushed {} entries from {}", count, self.location().display());
        true
    }

    fn stats(&self) -> CacheStats {
        self.stats.aggregate()
    }

    fn name(&self) -> &'static str {
        "Disk"
    }

    // == Purge Expired ==
    fn purge_expired(&mut self) -> usize {
        let files = match self.data_files() {
            Ok(files) => files,
            Err(e) => {
                warn!("Cannot scan {}: {}", self.location().display(), e);
                return 0;
            }
        };

        files
            .into_iter()
            .filter(|path| {
                fs::read(path)
                    .ok()
                    .and_then(decode_stored)
                    .map(|(node, _)| node.has_expired())
                    .unwrap_or(false)
            })
            .filter(|path| fs::remove_file(path).is_ok())
            .count()
    }
}

// == Utility Functions ==
/// Decodes a stored node regardless of whether it was compressed, and
/// reports which encoding it was stored with.
fn decode_stored(bytes: Vec<u8>) -> Option<(Node, Compression)> {
    if let Ok(node) = Node::from_bytes(&bytes) {
        return Some((node, Compression::None));
    }
    Compression::Zlib
        .decode(bytes)
        .ok()
        .and_then(|raw| Node::from_bytes(&raw).ok())
        .map(|node| (node, Compression::Zlib))
}

fn remove_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!("Cannot remove {}: {}", path.display(), e);
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::TempDir;

    fn open() -> (TempDir, DiskCache) {
        let dir = TempDir::new().unwrap();
        let cache = DiskCache::new(dir.path()).unwrap();
        (dir, cache)
    }

    fn data_file_count(dir: &TempDir) -> usize {
        fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| KeyMapper::is_data_file(&e.path()))
            .count()
    }

    #[test]
    fn test_new_requires_existing_directory() {
        let dir = TempDir::new().unwrap();
        let result = DiskCache::new(dir.path().join("missing"));
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn test_new_rejects_file_location() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("plain");
        fs::write(&file, b"x").unwrap();

        let result = DiskCache::new(&file);
        assert!(matches!(result, Err(CacheError::Config(_))));
    }

    #[test]
    fn test_from_settings_requires_location() {
        let result = DiskCache::from_settings(&HashMap::new());
        assert!(matches!(result, Err(CacheError::Config(_))));

        let dir = TempDir::new().unwrap();
        let mut settings = HashMap::new();
        settings.insert(
            "location".to_string(),
            dir.path().to_string_lossy().into_owned(),
        );
        assert!(DiskCache::from_settings(&settings).is_ok());
    }

    #[test]
    fn test_name() {
        let (_dir, cache) = open();
        assert_eq!(cache.name(), "Disk");
    }

    #[test]
    fn test_set_and_get() {
        let (_dir, mut cache) = open();

        let stored = cache.set("a", Value::Int(123), &Expiration::Never, Compression::None);
        assert_eq!(stored, Some(Value::Int(123)));
        assert_eq!(cache.get("a", Compression::None), Some(Value::Int(123)));
    }

    #[test]
    fn test_get_missing() {
        let (_dir, mut cache) = open();
        assert_eq!(cache.get("false", Compression::None), None);
    }

    #[test]
    fn test_set_never_overwrites() {
        let (_dir, mut cache) = open();

        assert!(cache
            .set("k", Value::from("v1"), &Expiration::Never, Compression::None)
            .is_some());
        assert!(cache
            .set("k", Value::from("v2"), &Expiration::Never, Compression::None)
            .is_none());
        assert_eq!(cache.get("k", Compression::None), Some(Value::from("v1")));
    }

    #[test]
    fn test_set_over_expired_node() {
        let (dir, mut cache) = open();

        cache.set("k", Value::from("old"), &Expiration::parse("-1 minute"), Compression::None);
        assert_eq!(data_file_count(&dir), 1);

        let stored = cache.set("k", Value::from("new"), &Expiration::Never, Compression::None);
        assert_eq!(stored, Some(Value::from("new")));
        assert_eq!(cache.get("k", Compression::None), Some(Value::from("new")));
    }

    #[test]
    fn test_replace() {
        let (_dir, mut cache) = open();

        cache.set("f", Value::Int(123), &Expiration::Never, Compression::None);
        let stored = cache.replace("f", Value::Int(1234), &Expiration::Never, Compression::None);

        assert_eq!(stored, Some(Value::Int(1234)));
        assert_eq!(cache.get("f", Compression::None), Some(Value::Int(1234)));
    }

    #[test]
    fn test_replace_absent_key() {
        let (_dir, mut cache) = open();

        let stored = cache.replace("fresh", Value::Int(1), &Expiration::Never, Compression::None);
        assert_eq!(stored, Some(Value::Int(1)));
    }

    #[test]
    fn test_compressed_round_trip() {
        let (_dir, mut cache) = open();
        let payload = Value::Bytes((0..=255).cycle().take(4096).collect());

        cache.set("z", payload.clone(), &Expiration::Never, Compression::Zlib);

        assert_eq!(cache.get("z", Compression::Zlib), Some(payload));
        // Reading with the wrong flag cannot decode the file.
        assert_eq!(cache.get("z", Compression::None), None);
    }

    #[test]
    fn test_expiration_removes_file_on_get() {
        let (dir, mut cache) = open();

        cache.set("t", Value::from("v"), &Expiration::Seconds(1), Compression::None);
        assert_eq!(cache.get("t", Compression::None), Some(Value::from("v")));

        sleep(Duration::from_millis(1100));

        assert_eq!(cache.get("t", Compression::None), None);
        assert_eq!(data_file_count(&dir), 0);
    }

    #[test]
    fn test_delete() {
        let (dir, mut cache) = open();

        cache.set("x", Value::from("hello"), &Expiration::Never, Compression::None);
        assert!(cache.delete("x", 0));
        assert!(!cache.delete("x", 0));
        assert_eq!(cache.get("x", Compression::None), None);
        assert_eq!(data_file_count(&dir), 0);
    }

    #[test]
    fn test_delete_with_timeout_defers_expiry() {
        let (_dir, mut cache) = open();

        cache.set("d", Value::from("v"), &Expiration::Never, Compression::None);
        assert!(cache.delete("d", 1));
        assert_eq!(cache.get("d", Compression::None), Some(Value::from("v")));

        sleep(Duration::from_millis(1100));

        assert_eq!(cache.get("d", Compression::None), None);
    }

    #[test]
    fn test_delete_with_timeout_keeps_compression() {
        let (_dir, mut cache) = open();

        cache.set("dz", Value::from("v"), &Expiration::Never, Compression::Zlib);
        assert!(cache.delete("dz", 1));
        assert_eq!(cache.get("dz", Compression::Zlib), Some(Value::from("v")));

        sleep(Duration::from_millis(1100));

        assert_eq!(cache.get("dz", Compression::Zlib), None);
    }

    #[test]
    fn test_delete_with_timeout_missing_key() {
        let (_dir, mut cache) = open();
        assert!(!cache.delete("nothing", 5));
    }

    #[test]
    fn test_increment_and_decrement() {
        let (_dir, mut cache) = open();

        cache.set("j", Value::Int(3), &Expiration::Never, Compression::None);
        assert_eq!(cache.decrement("j", 1, Compression::None), Some(2));
        assert_eq!(cache.get("j", Compression::None), Some(Value::Int(2)));

        cache.set("k", Value::Int(3), &Expiration::Never, Compression::None);
        assert_eq!(cache.decrement("k", 2, Compression::None), Some(1));

        assert_eq!(cache.increment("new", 5, Compression::None), Some(5));
        assert_eq!(cache.decrement("other", 4, Compression::None), Some(-4));
    }

    #[test]
    fn test_increment_numeric_text() {
        let (_dir, mut cache) = open();

        cache.set("n", Value::from("41"), &Expiration::Never, Compression::None);
        assert_eq!(cache.increment("n", 1, Compression::None), Some(42));
        assert_eq!(cache.get("n", Compression::None), Some(Value::Int(42)));
    }

    #[test]
    fn test_counters_on_compressed_values() {
        let (_dir, mut cache) = open();

        assert_eq!(cache.increment("fresh", 4, Compression::Zlib), Some(4));
        assert_eq!(cache.get("fresh", Compression::Zlib), Some(Value::Int(4)));

        cache.set("n", Value::Int(3), &Expiration::Never, Compression::Zlib);
        assert_eq!(cache.increment("n", 1, Compression::Zlib), Some(4));
        assert_eq!(cache.decrement("n", 2, Compression::Zlib), Some(2));
        assert_eq!(cache.get("n", Compression::Zlib), Some(Value::Int(2)));
    }

    #[test]
    fn test_negative_numeric_ttl_stores_expired_node() {
        let (dir, mut cache) = open();

        let stored = cache.set("gone", Value::Int(1), &Expiration::parse("-5"), Compression::None);
        assert_eq!(stored, Some(Value::Int(1)));
        assert_eq!(cache.get("gone", Compression::None), None);
        assert_eq!(data_file_count(&dir), 0);
    }

    #[test]
    fn test_fractional_numeric_ttl() {
        let (_dir, mut cache) = open();

        cache.set("half", Value::Int(1), &Expiration::parse("1.5"), Compression::None);
        assert_eq!(cache.get("half", Compression::None), Some(Value::Int(1)));

        sleep(Duration::from_millis(1600));

        assert_eq!(cache.get("half", Compression::None), None);
    }

    #[test]
    fn test_flush_keeps_stats_log() {
        let (dir, mut cache) = open();

        cache.set("a", Value::Int(1), &Expiration::Never, Compression::None);
        cache.set("b", Value::Int(2), &Expiration::Never, Compression::None);
        assert!(cache.flush());

        assert_eq!(cache.get("a", Compression::None), None);
        assert_eq!(cache.get("b", Compression::None), None);
        assert_eq!(data_file_count(&dir), 0);
        assert!(dir.path().join(crate::cache::STATS_LOG_NAME).exists());
    }

    #[test]
    fn test_stats() {
        let (_dir, mut cache) = open();

        cache.set("a", Value::from("hello"), &Expiration::Never, Compression::None);
        cache.get("a", Compression::None);
        cache.get("missing", Compression::None);

        let stats = cache.stats();
        assert_eq!(stats.connections, 1);
        assert_eq!(stats.sets, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.failures, 1);
        assert_eq!(stats.hit_rate(), 0.5);
        assert!(stats.size > 0);
    }

    #[test]
    fn test_purge_expired() {
        let (dir, mut cache) = open();

        cache.set("old", Value::Int(1), &Expiration::parse("-1 hour"), Compression::None);
        cache.set("old_z", Value::Int(1), &Expiration::parse("-1 hour"), Compression::Zlib);
        cache.set("live", Value::Int(2), &Expiration::Seconds(3600), Compression::None);

        assert_eq!(cache.purge_expired(), 2);
        assert_eq!(data_file_count(&dir), 1);
        assert_eq!(cache.get("live", Compression::None), Some(Value::Int(2)));
    }

    #[test]
    fn test_corrupt_file_is_a_miss_and_blocks_set() {
        let (_dir, mut cache) = open();
        let path = cache.mapper.locate("bad");
        fs::write(&path, b"garbage").unwrap();

        assert_eq!(cache.get("bad", Compression::None), None);
        assert!(cache
            .set("bad", Value::Int(1), &Expiration::Never, Compression::None)
            .is_none());
        assert!(cache
            .replace("bad", Value::Int(1), &Expiration::Never, Compression::None)
            .is_some());
    }
}
