//! Error types for media-backup

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for backup operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{role} directory does not exist: {}", .path.display())]
    MissingDirectory { role: &'static str, path: PathBuf },

    #[error("Could not determine free space for {}: {reason}", .path.display())]
    FreeSpaceUnavailable { path: PathBuf, reason: String },

    #[error(
        "Not enough free space in destination. Required: {:.2} MB, Available: {:.2} MB",
        mebibytes(.required),
        mebibytes(.available)
    )]
    InsufficientSpace { required: u64, available: u64 },

    #[error("Dedup index error: {reason}")]
    Index { reason: String },

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Required tool '{tool}' not found in PATH")]
    ToolNotFound { tool: String },

    #[error("Operation cancelled by user")]
    Cancelled,
}

impl Error {
    /// True when the error is a cooperative cancellation rather than a failure
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

fn mebibytes(bytes: &u64) -> f64 {
    *bytes as f64 / (1024.0 * 1024.0)
}

/// Result type alias for backup operations
pub type Result<T> = std::result::Result<T, Error>;
