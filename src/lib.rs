//! # media-backup
//!
//! Incremental, deduplicating backup of photos and videos into month-bucketed
//! folders.
//!
//! ## Features
//!
//! - **Two-pass engine**: a cheap planning pass sizes the copy-set before any byte is written
//! - **Lazy hashing**: only files that would actually be copied are hashed
//! - **Deduplication**: content hashes (SHA-256 or BLAKE3) in a durable SQLite index
//! - **Content dates**: EXIF for images, `ffprobe` metadata for videos
//! - **Atomic copies**: temp file, fsync, rename; interrupted copies leave nothing behind
//! - **Reports**: JSON and HTML summaries of every run
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use media_backup::config::BackupConfig;
//! use media_backup::index::SqliteIndex;
//! use media_backup::{BackupOrchestrator, BackupRequest, CancellationToken};
//! use std::path::Path;
//!
//! # fn main() -> media_backup::Result<()> {
//! let config = BackupConfig::default();
//! let mut index = SqliteIndex::open(Path::new("/mnt/backup/media-backup.db"), config.hash_algorithm)?;
//! let request = BackupRequest {
//!     source: "/home/me/Pictures".into(),
//!     destination: "/mnt/backup".into(),
//!     incremental: true,
//! };
//!
//! let result = BackupOrchestrator::new(config).run(&request, &mut index, &CancellationToken::new())?;
//! println!("Copied {} files", result.copied.len());
//! # Ok(())
//! # }
//! ```

pub mod backup;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod copy;
pub mod date;
pub mod destination;
pub mod error;
pub mod filter;
pub mod hash;
pub mod index;
pub mod logging;
pub mod report;
pub mod scanner;
pub mod space;
pub mod types;

// Re-export commonly used types
pub use backup::{BackupOrchestrator, BackupRequest, RunResult, RunStatus};
pub use cancel::CancellationToken;
pub use error::{Error, Result};
pub use hash::{ContentHash, HashAlgorithm};
pub use index::{DedupIndex, MemoryIndex, SqliteIndex};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
