//! Source tree enumeration.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Everything found under a source root
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Regular files, in walk order
    pub files: Vec<PathBuf>,
    /// Entries that could not be enumerated
    pub errors: Vec<String>,
}

/// Walks a source tree and lists its regular files
#[derive(Debug, Clone, Default)]
pub struct FileScanner {
    follow_symlinks: bool,
}

impl FileScanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_follow_symlinks(mut self, follow: bool) -> Self {
        self.follow_symlinks = follow;
        self
    }

    /// Enumerate files under `root`. Entries are sorted by file name within each
    /// directory so that processing order is stable between runs.
    pub fn scan(&self, root: &Path) -> ScanResult {
        let mut result = ScanResult::default();

        for entry in WalkDir::new(root)
            .follow_links(self.follow_symlinks)
            .sort_by_file_name()
        {
            match entry {
                Ok(entry) if entry.file_type().is_file() => {
                    result.files.push(entry.into_path());
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Walk error: {}", e);
                    result.errors.push(e.to_string());
                }
            }
        }

        debug!(
            "Scanned {}: {} files, {} walk errors",
            root.display(),
            result.files.len(),
            result.errors.len()
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_lists_files_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("b/nested")).unwrap();
        fs::write(root.join("b/nested/z.jpg"), b"z").unwrap();
        fs::write(root.join("a.jpg"), b"a").unwrap();
        fs::write(root.join("c.txt"), b"c").unwrap();

        let result = FileScanner::new().scan(root);

        assert!(result.errors.is_empty());
        assert_eq!(
            result.files,
            vec![root.join("a.jpg"), root.join("b/nested/z.jpg"), root.join("c.txt")]
        );
    }

    #[test]
    fn test_scan_missing_root_reports_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = FileScanner::new().scan(&temp_dir.path().join("missing"));
        assert!(result.files.is_empty());
        assert_eq!(result.errors.len(), 1);
    }
}
