//! Free-space planning for the destination volume.

use std::path::Path;
use tracing::info;

use crate::{Error, Result};

/// Default index growth estimate per planned copy, in bytes
pub const DEFAULT_INDEX_BYTES_PER_RECORD: u64 = 1024;

/// Reports the bytes available to unprivileged writers at a path
pub trait FreeSpace {
    fn available(&self, path: &Path) -> Result<u64>;
}

/// Free space from `statvfs(3)`
#[derive(Debug, Default, Clone, Copy)]
pub struct StatvfsFreeSpace;

#[cfg(unix)]
impl FreeSpace for StatvfsFreeSpace {
    fn available(&self, path: &Path) -> Result<u64> {
        use std::ffi::CString;
        use std::os::unix::ffi::OsStrExt;

        let unavailable = |reason: String| Error::FreeSpaceUnavailable {
            path: path.to_path_buf(),
            reason,
        };

        let raw = CString::new(path.as_os_str().as_bytes())
            .map_err(|e| unavailable(e.to_string()))?;
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let result = unsafe { libc::statvfs(raw.as_ptr(), &mut stat) };
        if result != 0 {
            return Err(unavailable(std::io::Error::last_os_error().to_string()));
        }

        // f_bavail is counted in fragments
        let fragment = if stat.f_frsize > 0 { stat.f_frsize } else { stat.f_bsize };
        let block_size = u128::from(fragment as u64);
        let free = block_size.saturating_mul(u128::from(stat.f_bavail as u64));
        Ok(free.min(u128::from(u64::MAX)) as u64)
    }
}

#[cfg(not(unix))]
impl FreeSpace for StatvfsFreeSpace {
    fn available(&self, path: &Path) -> Result<u64> {
        Err(Error::FreeSpaceUnavailable {
            path: path.to_path_buf(),
            reason: "free space query is not supported on this platform".to_string(),
        })
    }
}

/// Compares the planned copy-set against destination capacity
pub struct FreeSpacePlanner<'a> {
    free_space: &'a dyn FreeSpace,
    bytes_per_record: u64,
}

impl<'a> FreeSpacePlanner<'a> {
    pub fn new(free_space: &'a dyn FreeSpace) -> Self {
        Self {
            free_space,
            bytes_per_record: DEFAULT_INDEX_BYTES_PER_RECORD,
        }
    }

    pub fn with_bytes_per_record(mut self, bytes: u64) -> Self {
        self.bytes_per_record = bytes;
        self
    }

    /// Estimated index growth for `planned_files` new records
    pub fn index_growth(&self, planned_files: usize) -> u64 {
        self.bytes_per_record.saturating_mul(planned_files as u64)
    }

    /// Fails with [`Error::InsufficientSpace`] when the planned copies plus the
    /// index growth estimate do not fit, or propagates the free-space query error.
    pub fn check(&self, destination: &Path, planned_bytes: u64, planned_files: usize) -> Result<()> {
        let required = planned_bytes.saturating_add(self.index_growth(planned_files));
        let available = self.free_space.available(destination)?;

        info!(
            "Space check: {} bytes required ({} files), {} bytes available",
            required, planned_files, available
        );

        if available < required {
            return Err(Error::InsufficientSpace {
                required,
                available,
            });
        }

        Ok(())
    }
}
