use chrono::{DateTime, Utc};
use std::collections::HashMap;

use super::{DedupIndex, DedupRecord, RunMarker};
use crate::hash::ContentHash;
use crate::Result;

/// Non-persistent index, for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct MemoryIndex {
    records: HashMap<ContentHash, DedupRecord>,
    runs: Vec<RunMarker>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a previous run, e.g. to exercise incremental mode
    pub fn with_last_run(mut self, marker: RunMarker) -> Self {
        self.runs.push(marker);
        self
    }

    pub fn runs(&self) -> &[RunMarker] {
        &self.runs
    }
}

impl DedupIndex for MemoryIndex {
    fn last_run(&self) -> Option<DateTime<Utc>> {
        self.runs.iter().map(|run| run.started_at).max()
    }

    fn lookup(&self, hash: &ContentHash) -> Result<Option<DedupRecord>> {
        Ok(self.records.get(hash).cloned())
    }

    fn insert(&mut self, record: DedupRecord) -> Result<()> {
        self.records.entry(record.hash.clone()).or_insert(record);
        Ok(())
    }

    fn record_run(&mut self, marker: RunMarker) -> Result<()> {
        self.runs.push(marker);
        Ok(())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
