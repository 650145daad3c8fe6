use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::filter::lowercase_extension;

/// A source file that survived enumeration, with the metadata read at stat time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCandidate {
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub extension: String, // lowercase, no dot
}

impl FileCandidate {
    /// Stat `path` and build a candidate from its metadata
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            size: metadata.len(),
            modified: DateTime::from(metadata.modified()?),
            extension: lowercase_extension(path),
        })
    }
}

/// Why a candidate was not copied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    Extension,
    TooOld,
    NoDate,
    AlreadyPresent,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::Extension => "filtered (extension)",
            SkipReason::TooOld => "old (not newer than last backup)",
            SkipReason::NoDate => "no date found",
            SkipReason::AlreadyPresent => "already present at destination",
        };
        f.write_str(text)
    }
}

/// Stage at which a per-candidate error happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Stat,
    Destination,
    Hash,
    Copy,
    Index,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ErrorKind::Stat => "stat error",
            ErrorKind::Destination => "destination error",
            ErrorKind::Hash => "hash error",
            ErrorKind::Copy => "copy error",
            ErrorKind::Index => "index error",
        };
        f.write_str(text)
    }
}

/// Source and destination of a copied or duplicate file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePair {
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: SkipReason,
}

/// A per-candidate failure; processing continued past it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileError {
    pub path: PathBuf,
    pub kind: ErrorKind,
    pub message: String,
}

impl fmt::Display for FileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.path.display(), self.kind, self.message)
    }
}
