//! Planning pass: cheap checks only, no hashing, no index access, no copies.

use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tracing::debug;

use super::progress::BackupProgress;
use crate::date::DateResolver;
use crate::destination::DestinationPlanner;
use crate::filter::is_eligible;
use crate::types::{ErrorKind, FileCandidate, FileError, SkipReason};

/// A candidate that passed every pre-hash check
#[derive(Debug, Clone)]
pub struct PlannedCopy {
    pub candidate: FileCandidate,
    pub destination: PathBuf,
}

#[derive(Debug, Clone)]
pub enum Decision {
    Skip(SkipReason),
    Fail(FileError),
    Copy(PlannedCopy),
}

#[derive(Debug, Clone)]
pub struct PlanEntry {
    pub path: PathBuf,
    pub decision: Decision,
}

/// One entry per scanned path, in scan order.
///
/// Two candidates sharing a month and basename are both planned, so the
/// planned totals are an upper bound. Which one lands is settled when the
/// execution pass re-checks the destination.
#[derive(Debug, Default)]
pub struct CopyPlan {
    pub entries: Vec<PlanEntry>,
    pub planned_files: usize,
    pub planned_bytes: u64,
}

pub struct Planner<'a> {
    pub destinations: &'a DestinationPlanner,
    pub dates: &'a dyn DateResolver,
    /// Files modified at or before this instant are too old
    pub threshold: Option<DateTime<Utc>>,
}

impl Planner<'_> {
    pub fn plan(&self, files: &[PathBuf], progress: &mut dyn BackupProgress) -> CopyPlan {
        let mut plan = CopyPlan::default();

        for path in files {
            progress.on_plan_entry(path);
            let decision = self.decide(path);
            if let Decision::Copy(copy) = &decision {
                plan.planned_files += 1;
                plan.planned_bytes += copy.candidate.size;
            }
            plan.entries.push(PlanEntry {
                path: path.clone(),
                decision,
            });
        }

        plan
    }

    fn decide(&self, path: &Path) -> Decision {
        if !is_eligible(path) {
            return Decision::Skip(SkipReason::Extension);
        }

        let candidate = match FileCandidate::from_path(path) {
            Ok(candidate) => candidate,
            Err(e) => return fail(path, ErrorKind::Stat, e),
        };

        if let Some(threshold) = self.threshold {
            // second precision; equal counts as not newer
            if candidate.modified.timestamp() <= threshold.timestamp() {
                debug!("{}: not newer than last run", path.display());
                return Decision::Skip(SkipReason::TooOld);
            }
        }

        let Some(date) = self.dates.resolve(path) else {
            debug!("{}: no content date", path.display());
            return Decision::Skip(SkipReason::NoDate);
        };

        let destination = match self.destinations.prepare(path, date) {
            Ok(destination) => destination,
            Err(e) => return fail(path, ErrorKind::Destination, e),
        };

        if DestinationPlanner::exists(&destination) {
            debug!("{}: {} already present", path.display(), destination.display());
            return Decision::Skip(SkipReason::AlreadyPresent);
        }

        Decision::Copy(PlannedCopy {
            candidate,
            destination,
        })
    }
}

fn fail(path: &Path, kind: ErrorKind, error: impl ToString) -> Decision {
    Decision::Fail(FileError {
        path: path.to_path_buf(),
        kind,
        message: error.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backup::progress::NoProgress;
    use crate::date::ContentDate;
    use chrono::{Duration, NaiveDate};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    struct Dates(HashMap<PathBuf, ContentDate>);

    impl DateResolver for Dates {
        fn resolve(&self, path: &Path) -> Option<ContentDate> {
            self.0.get(path).copied()
        }
    }

    fn june() -> ContentDate {
        NaiveDate::from_ymd_opt(2023, 6, 15).unwrap()
    }

    #[test]
    fn test_plan_classifies_in_order() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src");
        let dest = temp_dir.path().join("dest");
        fs::create_dir_all(src.join("other")).unwrap();
        fs::create_dir_all(&dest).unwrap();

        let copy = src.join("IMG_0001.jpg");
        let collision = src.join("other").join("IMG_0001.jpg");
        let undated = src.join("IMG_0002.heic");
        let text = src.join("notes.txt");
        let missing = src.join("vanished.mp4");
        fs::write(&copy, b"12345").unwrap();
        fs::write(&collision, b"different").unwrap();
        fs::write(&undated, b"x").unwrap();
        fs::write(&text, b"x").unwrap();

        let dates = Dates(HashMap::from([
            (copy.clone(), june()),
            (collision.clone(), june()),
            (missing.clone(), june()),
        ]));
        let destinations = DestinationPlanner::new(&dest);
        let planner = Planner {
            destinations: &destinations,
            dates: &dates,
            threshold: None,
        };

        let files = vec![copy, collision, undated, text, missing];
        let plan = planner.plan(&files, &mut NoProgress);

        assert_eq!(plan.entries.len(), 5);
        // both name-colliding candidates stay planned
        assert_eq!(plan.planned_files, 2);
        assert_eq!(plan.planned_bytes, 14);
        let bucketed = dest.join("2023-06").join("IMG_0001.jpg");
        assert!(matches!(&plan.entries[0].decision, Decision::Copy(c) if c.destination == bucketed));
        assert!(matches!(&plan.entries[1].decision, Decision::Copy(c) if c.destination == bucketed));
        assert!(matches!(plan.entries[2].decision, Decision::Skip(SkipReason::NoDate)));
        assert!(matches!(plan.entries[3].decision, Decision::Skip(SkipReason::Extension)));
        assert!(matches!(&plan.entries[4].decision, Decision::Fail(e) if e.kind == ErrorKind::Stat));
    }

    #[test]
    fn test_threshold_boundary() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("clip.mp4");
        fs::write(&path, b"x").unwrap();
        let modified = FileCandidate::from_path(&path).unwrap().modified;

        let dates = Dates(HashMap::from([(path.clone(), june())]));
        let destinations = DestinationPlanner::new(&temp_dir.path().join("dest"));

        let at = |threshold| Planner {
            destinations: &destinations,
            dates: &dates,
            threshold: Some(threshold),
        };

        let equal = at(modified).plan(&[path.clone()], &mut NoProgress);
        assert!(matches!(equal.entries[0].decision, Decision::Skip(SkipReason::TooOld)));

        let earlier = at(modified - Duration::seconds(1)).plan(&[path], &mut NoProgress);
        assert!(matches!(earlier.entries[0].decision, Decision::Copy(_)));
    }
}
