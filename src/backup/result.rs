//! Run accounting: what happened to every visited candidate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

use crate::types::{FileError, FilePair, SkipReason, SkippedFile};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    /// Cancelled before every candidate was visited
    Interrupted,
}

/// Final result of a backup run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub status: RunStatus,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub total_found: usize,
    pub copied: Vec<FilePair>,
    pub duplicates: Vec<FilePair>,
    pub skipped: Vec<SkippedFile>,
    pub errors: Vec<FileError>,
    pub walk_errors: Vec<String>,
    pub bytes_copied: u64,
    pub planned_bytes: u64,
    pub elapsed: Duration,
}

impl RunResult {
    /// Candidates that received a classification
    pub fn accounted(&self) -> usize {
        self.copied.len() + self.skipped.len() + self.duplicates.len() + self.errors.len()
    }

    /// Every candidate found was classified exactly once
    pub fn is_fully_accounted(&self) -> bool {
        self.accounted() == self.total_found
    }

    pub fn is_interrupted(&self) -> bool {
        self.status == RunStatus::Interrupted
    }

    /// Per-file and walk errors as display strings
    pub fn error_messages(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(ToString::to_string)
            .chain(self.walk_errors.iter().map(|e| format!("walk error: {}", e)))
            .collect()
    }

    /// Number of skipped entries with `reason`
    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.skipped.iter().filter(|s| s.reason == reason).count()
    }
}

/// Accumulates outcomes during the execution pass. Owned by the orchestrator
/// and consumed exactly once by [`finish`](Self::finish).
#[derive(Debug)]
pub struct RunResultBuilder {
    result: RunResult,
}

impl RunResultBuilder {
    pub fn new(run_id: Uuid, started_at: DateTime<Utc>, source: &Path, destination: &Path) -> Self {
        Self {
            result: RunResult {
                run_id,
                started_at,
                status: RunStatus::Completed,
                source: source.to_path_buf(),
                destination: destination.to_path_buf(),
                total_found: 0,
                copied: Vec::new(),
                duplicates: Vec::new(),
                skipped: Vec::new(),
                errors: Vec::new(),
                walk_errors: Vec::new(),
                bytes_copied: 0,
                planned_bytes: 0,
                elapsed: Duration::ZERO,
            },
        }
    }

    pub fn total_found(&mut self, total: usize) -> &mut Self {
        self.result.total_found = total;
        self
    }

    pub fn planned_bytes(&mut self, bytes: u64) -> &mut Self {
        self.result.planned_bytes = bytes;
        self
    }

    pub fn walk_errors(&mut self, errors: Vec<String>) -> &mut Self {
        self.result.walk_errors.extend(errors);
        self
    }

    pub fn copied(&mut self, source: &Path, destination: &Path, bytes: u64) {
        self.result.copied.push(FilePair {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
        });
        self.result.bytes_copied += bytes;
    }

    pub fn duplicate(&mut self, source: &Path, destination: &Path) {
        self.result.duplicates.push(FilePair {
            source: source.to_path_buf(),
            destination: destination.to_path_buf(),
        });
    }

    pub fn skipped(&mut self, path: &Path, reason: SkipReason) {
        self.result.skipped.push(SkippedFile {
            path: path.to_path_buf(),
            reason,
        });
    }

    pub fn error(&mut self, error: FileError) {
        self.result.errors.push(error);
    }

    pub fn finish(self, status: RunStatus, elapsed: Duration) -> RunResult {
        let mut result = self.result;
        result.status = status;
        result.elapsed = elapsed;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_accounting_and_messages() {
        let mut builder = RunResultBuilder::new(Uuid::new_v4(), Utc::now(), Path::new("/src"), Path::new("/dest"));
        builder.total_found(4).planned_bytes(30).walk_errors(vec!["io error at /src/x".to_string()]);
        builder.copied(Path::new("/src/a.jpg"), Path::new("/dest/2023-06/a.jpg"), 10);
        builder.duplicate(Path::new("/src/b.jpg"), Path::new("/dest/2023-06/a.jpg"));
        builder.skipped(Path::new("/src/c.txt"), SkipReason::Extension);
        builder.error(FileError {
            path: PathBuf::from("/src/d.jpg"),
            kind: ErrorKind::Hash,
            message: "denied".to_string(),
        });

        let result = builder.finish(RunStatus::Completed, Duration::from_secs(2));

        assert!(result.is_fully_accounted());
        assert_eq!(result.bytes_copied, 10);
        assert_eq!(result.skipped_for(SkipReason::Extension), 1);
        assert_eq!(
            result.error_messages(),
            vec![
                "/src/d.jpg: hash error: denied".to_string(),
                "walk error: io error at /src/x".to_string()
            ]
        );
    }

    #[test]
    fn test_interrupted_run_is_not_fully_accounted() {
        let mut builder = RunResultBuilder::new(Uuid::new_v4(), Utc::now(), Path::new("/src"), Path::new("/dest"));
        builder.total_found(3);
        builder.skipped(Path::new("/src/a.txt"), SkipReason::Extension);

        let result = builder.finish(RunStatus::Interrupted, Duration::ZERO);
        assert!(result.is_interrupted());
        assert!(!result.is_fully_accounted());
    }
}
