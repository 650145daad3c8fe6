//! Month-bucketed destination layout: `<dest>/<YYYY-MM>/<basename>`.

use std::fs;
use std::path::{Path, PathBuf};

use crate::date::ContentDate;
use crate::{Error, Result};

/// Name of the month bucket directory for `date`, e.g. `2023-06`
pub fn month_bucket(date: ContentDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Computes destination paths under a destination root
#[derive(Debug, Clone)]
pub struct DestinationPlanner {
    root: PathBuf,
}

impl DestinationPlanner {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Destination path for `source` dated `date`, without touching the filesystem
    pub fn destination_for(&self, source: &Path, date: ContentDate) -> Result<PathBuf> {
        let file_name = source.file_name().ok_or_else(|| Error::Configuration {
            reason: format!("no file name in {}", source.display()),
        })?;
        Ok(self.root.join(month_bucket(date)).join(file_name))
    }

    /// Like [`destination_for`](Self::destination_for), and also creates the month
    /// bucket directory. Never creates the destination file itself.
    pub fn prepare(&self, source: &Path, date: ContentDate) -> Result<PathBuf> {
        let destination = self.destination_for(source, date)?;
        if let Some(bucket) = destination.parent() {
            fs::create_dir_all(bucket)?;
        }
        Ok(destination)
    }

    pub fn exists(destination: &Path) -> bool {
        destination.exists()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn june_15() -> ContentDate {
        NaiveDate::from_ymd_opt(2023, 6, 15).unwrap()
    }

    #[test]
    fn test_month_bucket_zero_pads() {
        assert_eq!(month_bucket(NaiveDate::from_ymd_opt(2009, 1, 31).unwrap()), "2009-01");
    }

    #[test]
    fn test_prepare_creates_bucket_only() {
        let temp_dir = TempDir::new().unwrap();
        let planner = DestinationPlanner::new(temp_dir.path());

        let destination = planner
            .prepare(Path::new("/photos/DCIM/IMG_0001.jpg"), june_15())
            .unwrap();

        assert_eq!(destination, temp_dir.path().join("2023-06").join("IMG_0001.jpg"));
        assert!(temp_dir.path().join("2023-06").is_dir());
        assert!(!DestinationPlanner::exists(&destination));

        // idempotent
        planner
            .prepare(Path::new("/photos/other/IMG_0002.jpg"), june_15())
            .unwrap();
    }

    #[test]
    fn test_source_without_file_name() {
        let temp_dir = TempDir::new().unwrap();
        let planner = DestinationPlanner::new(temp_dir.path());
        assert!(planner.destination_for(Path::new("/"), june_15()).is_err());
    }
}
