//! Backup engine: a planning pass that sizes the copy-set, a free-space check,
//! then an execution pass that hashes, deduplicates and copies.
//!
//! Checks run cheapest first (extension, modification time, content date,
//! destination exists) so that files which will never be copied are never
//! hashed.

pub mod plan;
pub mod progress;
pub mod result;

use chrono::Utc;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, span, warn, Level};
use uuid::Uuid;

use crate::cancel::CancellationToken;
use crate::config::BackupConfig;
use crate::copy::CopyEngine;
use crate::date::{DateResolver, MediaDateResolver};
use crate::destination::DestinationPlanner;
use crate::hash::hash_file;
use crate::index::{DedupIndex, DedupRecord, RunMarker};
use crate::scanner::FileScanner;
use crate::space::{FreeSpace, FreeSpacePlanner, StatvfsFreeSpace};
use crate::types::{ErrorKind, FileError, SkipReason};
use crate::{Error, Result};

pub use plan::{CopyPlan, Decision, PlanEntry, PlannedCopy, Planner};
pub use progress::{BackupProgress, ConsoleProgress, NoProgress};
pub use result::{RunResult, RunResultBuilder, RunStatus};

/// What to back up and where
#[derive(Debug, Clone)]
pub struct BackupRequest {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub incremental: bool,
}

/// Execution-pass outcome for one planned copy
#[derive(Debug)]
enum Transfer {
    Copied { bytes: u64 },
    Duplicate,
    Skipped(SkipReason),
    Failed(FileError),
    Cancelled,
}

pub struct BackupOrchestrator {
    config: BackupConfig,
    dates: Box<dyn DateResolver + Send>,
    free_space: Box<dyn FreeSpace + Send>,
    progress: Box<dyn BackupProgress>,
    copier: CopyEngine,
}

impl BackupOrchestrator {
    pub fn new(config: BackupConfig) -> Self {
        let copier = CopyEngine::new().with_buffer_size(config.copy_buffer_size);
        Self {
            config,
            dates: Box::new(MediaDateResolver::new()),
            free_space: Box::new(StatvfsFreeSpace),
            progress: Box::new(NoProgress),
            copier,
        }
    }

    pub fn with_date_resolver(mut self, dates: impl DateResolver + Send + 'static) -> Self {
        self.dates = Box::new(dates);
        self
    }

    pub fn with_free_space(mut self, free_space: impl FreeSpace + Send + 'static) -> Self {
        self.free_space = Box::new(free_space);
        self
    }

    pub fn with_progress(mut self, progress: impl BackupProgress + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Run a backup.
    ///
    /// Fatal preconditions (missing directories, free space) return `Err` before
    /// anything is copied, and the progress sink sees `on_abort` instead of
    /// `on_finish`. Everything else, cancellation included, ends in a
    /// finalized [`RunResult`].
    pub fn run(
        &mut self,
        request: &BackupRequest,
        index: &mut dyn DedupIndex,
        cancel: &CancellationToken,
    ) -> Result<RunResult> {
        let span = span!(Level::INFO, "backup", source = %request.source.display());
        let _enter = span.enter();

        let clock = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4();

        require_directory("Source", &request.source)?;
        require_directory("Destination", &request.destination)?;

        let threshold = if request.incremental {
            index.last_run()
        } else {
            None
        };
        match threshold {
            Some(t) => info!("Incremental run: only files modified after {}", t),
            None => info!("Full run: all files are considered"),
        }

        let scan = FileScanner::new()
            .with_follow_symlinks(self.config.follow_symlinks)
            .scan(&request.source);
        info!("Found {} files ({} walk errors)", scan.files.len(), scan.errors.len());
        self.progress.on_scan_complete(scan.files.len());

        let destinations = DestinationPlanner::new(&request.destination);
        let plan = Planner {
            destinations: &destinations,
            dates: self.dates.as_ref(),
            threshold,
        }
        .plan(&scan.files, self.progress.as_mut());
        info!(
            "Planned {} copies, {} bytes",
            plan.planned_files, plan.planned_bytes
        );
        self.progress.on_plan_complete(plan.planned_files, plan.planned_bytes);

        let capacity = FreeSpacePlanner::new(self.free_space.as_ref())
            .with_bytes_per_record(self.config.index_bytes_per_record)
            .check(&request.destination, plan.planned_bytes, plan.planned_files);
        if let Err(e) = capacity {
            warn!("Aborting before any copy: {}", e);
            self.progress.on_abort();
            return Err(e);
        }

        let mut builder = RunResultBuilder::new(run_id, started_at, &request.source, &request.destination);
        builder
            .total_found(scan.files.len())
            .planned_bytes(plan.planned_bytes)
            .walk_errors(scan.errors);

        let status = self.execute(&plan, index, cancel, &mut builder);
        let result = builder.finish(status, clock.elapsed());
        self.progress.on_finish(status);

        match status {
            RunStatus::Completed => {
                let marker = RunMarker {
                    run_id,
                    started_at,
                    finished_at: Utc::now(),
                };
                if let Err(e) = index.record_run(marker) {
                    warn!("Could not record run in dedup index: {}", e);
                }
            }
            RunStatus::Interrupted => {
                warn!(
                    "Backup interrupted after {} of {} candidates",
                    result.accounted(),
                    result.total_found
                );
            }
        }

        info!(
            "Copied {}, duplicates {}, skipped {}, errors {} of {} found",
            result.copied.len(),
            result.duplicates.len(),
            result.skipped.len(),
            result.errors.len(),
            result.total_found
        );
        Ok(result)
    }

    /// Walk the plan in scan order. Planning-pass classifications are committed
    /// as they are visited; planned copies go through hash, dedup and copy.
    fn execute(
        &mut self,
        plan: &CopyPlan,
        index: &mut dyn DedupIndex,
        cancel: &CancellationToken,
        builder: &mut RunResultBuilder,
    ) -> RunStatus {
        for entry in &plan.entries {
            if cancel.is_cancelled() {
                info!("Cancellation requested, stopping before {}", entry.path.display());
                return RunStatus::Interrupted;
            }
            self.progress.on_execute_entry(&entry.path);

            match &entry.decision {
                Decision::Skip(reason) => builder.skipped(&entry.path, *reason),
                Decision::Fail(error) => {
                    warn!("{}", error);
                    builder.error(error.clone());
                }
                Decision::Copy(copy) => match self.transfer(copy, index, cancel) {
                    Transfer::Copied { bytes } => {
                        builder.copied(&entry.path, &copy.destination, bytes)
                    }
                    Transfer::Duplicate => builder.duplicate(&entry.path, &copy.destination),
                    Transfer::Skipped(reason) => builder.skipped(&entry.path, reason),
                    Transfer::Failed(error) => {
                        warn!("{}", error);
                        builder.error(error);
                    }
                    Transfer::Cancelled => {
                        info!("Copy of {} cancelled", entry.path.display());
                        return RunStatus::Interrupted;
                    }
                },
            }
        }

        RunStatus::Completed
    }

    fn transfer(
        &self,
        copy: &PlannedCopy,
        index: &mut dyn DedupIndex,
        cancel: &CancellationToken,
    ) -> Transfer {
        let source = &copy.candidate.path;
        let failed = |kind, message: String| {
            Transfer::Failed(FileError {
                path: source.clone(),
                kind,
                message,
            })
        };

        // the destination may have appeared since planning
        if DestinationPlanner::exists(&copy.destination) {
            return Transfer::Skipped(SkipReason::AlreadyPresent);
        }

        let hash = match hash_file(source, self.config.hash_algorithm) {
            Ok(hash) => hash,
            Err(e) => return failed(ErrorKind::Hash, e.to_string()),
        };

        match index.lookup(&hash) {
            Ok(Some(existing)) => {
                debug!(
                    "{}: duplicate of {} (copied from {})",
                    source.display(),
                    existing.destination.display(),
                    existing.source.display()
                );
                return Transfer::Duplicate;
            }
            Ok(None) => {}
            Err(e) => return failed(ErrorKind::Index, e.to_string()),
        }

        let bytes = match self.copier.copy(source, &copy.destination, cancel) {
            Ok(bytes) => bytes,
            Err(Error::Cancelled) => return Transfer::Cancelled,
            Err(e) => return failed(ErrorKind::Copy, e.to_string()),
        };

        let record = DedupRecord {
            hash,
            source: source.clone(),
            destination: copy.destination.clone(),
            size: bytes,
            modified: copy.candidate.modified,
            recorded_at: Utc::now(),
        };
        if let Err(e) = index.insert(record) {
            return failed(ErrorKind::Index, format!("copied but not recorded: {}", e));
        }

        Transfer::Copied { bytes }
    }
}

fn require_directory(role: &'static str, path: &Path) -> Result<()> {
    if path.is_dir() {
        Ok(())
    } else {
        Err(Error::MissingDirectory {
            role,
            path: path.to_path_buf(),
        })
    }
}
