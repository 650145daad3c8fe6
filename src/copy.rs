//! Atomic, cancellable single-file copy.
//!
//! Bytes are written to a hidden temporary file next to the destination, synced,
//! and renamed into place. On any failure or cancellation the temporary file is
//! removed, so the destination path only ever holds a complete copy.

use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::{Error, Result};

/// Default copy buffer (1 MiB)
pub const DEFAULT_COPY_BUFFER_SIZE: usize = 1024 * 1024;

/// Suffix of in-flight temporary files
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Removes the temporary file unless the copy was committed
struct TempGuard {
    path: PathBuf,
    committed: bool,
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.committed {
            if let Err(e) = fs::remove_file(&self.path) {
                debug!("Could not remove {}: {}", self.path.display(), e);
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct CopyEngine {
    buffer_size: usize,
}

impl Default for CopyEngine {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_COPY_BUFFER_SIZE,
        }
    }
}

impl CopyEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size.max(1);
        self
    }

    /// Temporary path used while copying to `destination`
    fn temp_path(destination: &Path) -> Result<PathBuf> {
        let file_name = destination.file_name().ok_or_else(|| Error::Configuration {
            reason: format!("no file name in {}", destination.display()),
        })?;
        let temp_name = format!(
            ".{}.{}{}",
            file_name.to_string_lossy(),
            Uuid::new_v4().simple(),
            PARTIAL_SUFFIX
        );
        Ok(destination.with_file_name(temp_name))
    }

    /// Copy `source` to `destination`, returning the number of bytes written.
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires mid-transfer.
    pub fn copy(&self, source: &Path, destination: &Path, cancel: &CancellationToken) -> Result<u64> {
        cancel.check()?;

        let reader = File::open(source)?;
        let copied = self.copy_from(reader, destination, cancel)?;

        debug!("Copied {} -> {} ({} bytes)", source.display(), destination.display(), copied);
        Ok(copied)
    }

    /// Drain `reader` into `destination` through a temporary file, checking
    /// `cancel` before every buffer.
    fn copy_from(&self, mut reader: impl Read, destination: &Path, cancel: &CancellationToken) -> Result<u64> {
        let temp_path = Self::temp_path(destination)?;
        let mut writer = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        let mut guard = TempGuard {
            path: temp_path,
            committed: false,
        };

        let mut buffer = vec![0u8; self.buffer_size];
        let mut copied = 0u64;
        loop {
            cancel.check()?;
            let bytes_read = reader.read(&mut buffer)?;
            if bytes_read == 0 {
                break;
            }
            writer.write_all(&buffer[..bytes_read])?;
            copied += bytes_read as u64;
        }

        writer.sync_all()?;
        drop(writer);

        cancel.check()?;
        fs::rename(&guard.path, destination)?;
        guard.committed = true;
        Ok(copied)
    }
}
