//! Stats Log Module
//!
//! Append-only event log shared by every process using the same cache
//! directory. Each event is one tag per line (`c`, `w`, `r`, `f`). Appends
//! happen under an exclusive advisory lock, so concurrent writers never lose
//! each other's increments.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use fs2::FileExt;
use tracing::{debug, warn};

use crate::cache::{CacheStats, KeyMapper};

/// File name of the stats log inside the cache directory.
pub const STATS_LOG_NAME: &str = "__stats_log";

const LOCK_ATTEMPTS: u32 = 50;
const LOCK_BACKOFF: Duration = Duration::from_millis(2);

// == Stat Event ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatEvent {
    Connect,
    Write,
    Read,
    Failure,
}

impl StatEvent {
    pub fn tag(self) -> u8 {
        match self {
            StatEvent::Connect => b'c',
            StatEvent::Write => b'w',
            StatEvent::Read => b'r',
            StatEvent::Failure => b'f',
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "c" => Some(StatEvent::Connect),
            "w" => Some(StatEvent::Write),
            "r" => Some(StatEvent::Read),
            "f" => Some(StatEvent::Failure),
            _ => None,
        }
    }
}

#[derive(Clone, Copy)]
enum LockMode {
    Shared,
    Exclusive,
}

// == Stats Log ==
#[derive(Debug, Clone)]
pub struct StatsLog {
    directory: PathBuf,
    path: PathBuf,
}

impl StatsLog {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let directory = directory.into();
        let path = directory.join(STATS_LOG_NAME);
        Self { directory, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // == Record ==
    /// Appends one event. Best effort: failures are logged and swallowed so
    /// the cache operation the event belongs to is never affected.
    pub fn record(&self, event: StatEvent) {
        if let Err(e) = self.append(event) {
            warn!(
                "Dropping stats event '{}' for {}: {}",
                event.tag() as char,
                self.path.display(),
                e
            );
        }
    }

    fn append(&self, event: StatEvent) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        lock(&file, LockMode::Exclusive)?;
        // A single write keeps tag and newline together.
        let result = file.write_all(&[event.tag(), b'\n']);
        let _ = FileExt::unlock(&file);
        result
    }

    // == Aggregate ==
    /// Tallies every event in the log and sums the size of all data files in
    /// the cache directory. Unknown tags are skipped.
    pub fn aggregate(&self) -> CacheStats {
        let mut stats = match self.tally() {
            Ok(stats) => stats,
            Err(e) => {
                warn!("Could not read stats log {}: {}", self.path.display(), e);
                CacheStats::new()
            }
        };
        stats.size = self.data_size();
        stats
    }

    fn tally(&self) -> io::Result<CacheStats> {
        let mut stats = CacheStats::new();

        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(stats),
            Err(e) => return Err(e),
        };

        lock(&file, LockMode::Shared)?;
        let result = count_events(&file, &mut stats);
        let _ = FileExt::unlock(&file);

        result.map(|_| stats)
    }

    fn data_size(&self) -> u64 {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Could not list {}: {}", self.directory.display(), e);
                return 0;
            }
        };

        entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| KeyMapper::is_data_file(&entry.path()))
            .filter_map(|entry| entry.metadata().ok())
            .filter(|meta| meta.is_file())
            .map(|meta| meta.len())
            .sum()
    }
}

fn count_events(file: &File, stats: &mut CacheStats) -> io::Result<()> {
    for line in BufReader::new(file).lines() {
        match StatEvent::from_tag(line?.trim()) {
            Some(StatEvent::Connect) => stats.record_connection(),
            Some(StatEvent::Write) => stats.record_write(),
            Some(StatEvent::Read) => stats.record_hit(),
            Some(StatEvent::Failure) => stats.record_failure(),
            None => {}
        }
    }
    Ok(())
}

/// Takes an advisory lock, retrying briefly while another process holds it.
fn lock(file: &File, mode: LockMode) -> io::Result<()> {
    let contended = fs2::lock_contended_error().kind();
    let mut attempt = 0;
    loop {
        let result = match mode {
            LockMode::Shared => FileExt::try_lock_shared(file),
            LockMode::Exclusive => FileExt::try_lock_exclusive(file),
        };
        match result {
            Err(e) if e.kind() == contended && attempt < LOCK_ATTEMPTS => {
                attempt += 1;
                thread::sleep(LOCK_BACKOFF);
            }
            other => return other,
        }
    }
}
