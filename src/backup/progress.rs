//! Progress callbacks for backup runs.

use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

use super::result::RunStatus;

/// Progress callback for backup operations. Every method defaults to a no-op.
pub trait BackupProgress: Send {
    /// Called once enumeration finished
    fn on_scan_complete(&mut self, _total_found: usize) {}

    /// Called for each candidate during the planning pass
    fn on_plan_entry(&mut self, _path: &Path) {}

    /// Called once the copy-set is known
    fn on_plan_complete(&mut self, _planned_files: usize, _planned_bytes: u64) {}

    /// Called for each candidate visited during the execution pass
    fn on_execute_entry(&mut self, _path: &Path) {}

    /// Called once a run that got past planning ends with a result
    fn on_finish(&mut self, _status: RunStatus) {}

    /// Called when a fatal precondition stops the run before anything is copied
    fn on_abort(&mut self) {}
}

/// Reports nothing
#[derive(Debug, Default)]
pub struct NoProgress;

impl BackupProgress for NoProgress {}

/// Terminal progress bar for the planning and execution passes
#[derive(Default)]
pub struct ConsoleProgress {
    bar: Option<ProgressBar>,
    total: u64,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_bar(&mut self, prefix: &'static str) {
        if let Some(old) = self.bar.take() {
            old.finish_and_clear();
        }
        let bar = ProgressBar::new(self.total);
        let style = ProgressStyle::with_template(
            "{prefix:>10} [{bar:20.cyan/dim}] {pos}/{len} ({per_sec}, eta {eta}) {wide_msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        bar.set_prefix(prefix);
        self.bar = Some(bar);
    }

    fn tick(&self, path: &Path) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
            if let Some(name) = path.file_name() {
                bar.set_message(name.to_string_lossy().into_owned());
            }
        }
    }
}

impl BackupProgress for ConsoleProgress {
    fn on_scan_complete(&mut self, total_found: usize) {
        self.total = total_found as u64;
        self.start_bar("Planning");
    }

    fn on_plan_entry(&mut self, path: &Path) {
        self.tick(path);
    }

    fn on_plan_complete(&mut self, _planned_files: usize, _planned_bytes: u64) {
        self.start_bar("Processing");
    }

    fn on_execute_entry(&mut self, path: &Path) {
        self.tick(path);
    }

    fn on_finish(&mut self, _status: RunStatus) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }

    fn on_abort(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.abandon();
        }
    }
}
