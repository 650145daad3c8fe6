//! Persistent dedup index: content hash → record of the file copied for it.

pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::hash::ContentHash;
use crate::Result;

pub use memory::MemoryIndex;
pub use sqlite::{SqliteIndex, DEFAULT_INDEX_FILE_NAME};

/// Written once per successfully copied file; never mutated afterwards
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DedupRecord {
    pub hash: ContentHash,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub recorded_at: DateTime<Utc>,
}

/// A completed run. The latest marker's start time is the incremental threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunMarker {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub trait DedupIndex {
    /// Start time of the most recent completed run, if any
    fn last_run(&self) -> Option<DateTime<Utc>>;

    fn lookup(&self, hash: &ContentHash) -> Result<Option<DedupRecord>>;

    fn contains(&self, hash: &ContentHash) -> Result<bool> {
        Ok(self.lookup(hash)?.is_some())
    }

    /// Store `record`. Must be durable before returning.
    fn insert(&mut self, record: DedupRecord) -> Result<()>;

    fn record_run(&mut self, marker: RunMarker) -> Result<()>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}
