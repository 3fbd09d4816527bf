//! Key Mapper Module
//!
//! Maps logical cache keys to content-addressed file names.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Extension of every data file written by the disk backend.
pub const CACHE_EXTENSION: &str = "cache";

// == Key Mapper ==
/// Deterministic key to file mapping: `directory/<sha256(key)>.cache`.
#[derive(Debug, Clone)]
pub struct KeyMapper {
    directory: PathBuf,
}

impl KeyMapper {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Returns the data file path for `key`.
    pub fn locate(&self, key: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", digest(key), CACHE_EXTENSION))
    }

    /// Whether `path` names a data file (as opposed to the stats log or a
    /// write in progress).
    pub fn is_data_file(path: &Path) -> bool {
        path.extension().and_then(|ext| ext.to_str()) == Some(CACHE_EXTENSION)
    }
}

/// Hex-encoded SHA-256 of the key.
pub fn digest(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}
