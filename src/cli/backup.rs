//! Backup command implementation.

use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::prompt::{prompt_confirm, prompt_path};
use crate::backup::{BackupOrchestrator, BackupRequest, ConsoleProgress, RunResult, RunStatus};
use crate::config::AppConfig;
use crate::date::{ensure_tool_available, FFPROBE};
use crate::index::{DedupIndex, SqliteIndex};
use crate::report::{default_report_path, format_bytes, ReportGenerator};
use crate::types::SkipReason;
use crate::{CancellationToken, Error};

/// Arguments for the backup command
#[derive(Args)]
pub struct BackupArgs {
    /// Source folder to back up
    #[arg(long)]
    pub src: Option<PathBuf>,

    /// Destination root; files land in YYYY-MM subfolders
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// Dedup index file (default: <dest>/<index file name>)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// HTML report path; the JSON report is written next to it
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Only consider files modified after the last completed run
    #[arg(long)]
    pub incremental: Option<bool>,

    /// Ask for source, destination and mode even when given
    #[arg(short, long)]
    pub interactive: bool,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Run the backup command
pub async fn run(args: BackupArgs, config: AppConfig) -> Result<()> {
    let request = preflight(&args, &config, FFPROBE)?;

    let db_path = args
        .db
        .clone()
        .unwrap_or_else(|| request.destination.join(&config.backup.index_file_name));
    let index = SqliteIndex::open(&db_path, config.backup.hash_algorithm)
        .with_context(|| format!("Failed to open dedup index {}", db_path.display()))?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        eprintln!("\n{}", "Interrupt received, stopping...".yellow());
        signal_token.cancel();
    });

    println!(
        "Starting backup: {} -> {}{}",
        request.source.display(),
        request.destination.display(),
        if request.incremental { " (incremental)" } else { "" }
    );

    let mut orchestrator = BackupOrchestrator::new(config.backup.clone());
    if !args.no_progress {
        orchestrator = orchestrator.with_progress(ConsoleProgress::new());
    }

    let engine_request = request.clone();
    let engine_cancel = cancel.clone();
    let (outcome, mut index) = tokio::task::spawn_blocking(move || {
        let mut index = index;
        let outcome = orchestrator.run(&engine_request, &mut index, &engine_cancel);
        (outcome, index)
    })
    .await
    .context("Backup task failed")?;

    if let Err(e) = index.close() {
        warn!("Failed to close dedup index: {}", e);
    }
    let result = outcome?;

    let report_path = args
        .report
        .clone()
        .unwrap_or_else(|| default_report_path(&request.destination));
    let written = match ReportGenerator::new(config.report.json, config.report.html)
        .write(&result, &report_path)
        .await
    {
        Ok(written) => written,
        Err(e) => {
            warn!("Failed to write report: {:#}", e);
            Vec::new()
        }
    };
    for path in &written {
        info!("Report written to {}", path.display());
    }

    print_summary(&result, &written);

    if result.is_interrupted() {
        bail!(Error::Cancelled);
    }
    Ok(())
}

/// Check the external date tool, then settle the request. The tool check comes
/// first so a missing tool fails before any prompt is shown.
fn preflight(args: &BackupArgs, config: &AppConfig, tool: &str) -> Result<BackupRequest> {
    ensure_tool_available(tool)?;

    let request = resolve_request(args, config)?;
    require_directory("Source", &request.source)?;
    require_directory("Destination", &request.destination)?;
    Ok(request)
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Could not install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Fill in source, destination and mode from arguments, config and, when
/// anything is missing or `--interactive` is set, stdin.
fn resolve_request(args: &BackupArgs, config: &AppConfig) -> Result<BackupRequest> {
    let incremental = args.incremental.unwrap_or(config.backup.incremental);

    let (source, destination, incremental) = match (&args.src, &args.dest) {
        (Some(src), Some(dest)) if !args.interactive => (src.clone(), dest.clone(), incremental),
        _ => {
            let source = prompt_path("Source folder", args.src.as_ref())?;
            let destination = prompt_path("Destination folder", args.dest.as_ref())?;
            let incremental = prompt_confirm(
                "Incremental (only files modified since the last backup)?",
                Some(incremental),
            )?;
            (source, destination, incremental)
        }
    };

    Ok(BackupRequest {
        source,
        destination,
        incremental,
    })
}

fn require_directory(role: &'static str, path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(Error::MissingDirectory {
            role,
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(())
}

fn print_summary(result: &RunResult, reports: &[PathBuf]) {
    println!();
    match result.status {
        RunStatus::Completed => println!("{}", "Backup completed".green().bold()),
        RunStatus::Interrupted => println!(
            "{}",
            format!(
                "Backup INTERRUPTED: {} of {} files were processed",
                result.accounted(),
                result.total_found
            )
            .red()
            .bold()
        ),
    }

    println!("  Found:      {}", result.total_found);
    println!(
        "  Copied:     {} ({})",
        result.copied.len().to_string().green(),
        format_bytes(result.bytes_copied)
    );
    println!("  Duplicates: {}", result.duplicates.len().to_string().cyan());
    println!(
        "  Skipped:    {} (filtered {}, old {}, no date {}, present {})",
        result.skipped.len(),
        result.skipped_for(SkipReason::Extension),
        result.skipped_for(SkipReason::TooOld),
        result.skipped_for(SkipReason::NoDate),
        result.skipped_for(SkipReason::AlreadyPresent)
    );

    let errors = result.error_messages();
    if errors.is_empty() {
        println!("  Errors:     0");
    } else {
        println!("  Errors:     {}", errors.len().to_string().red());
        for error in &errors {
            println!("    {}", error.red());
        }
    }
    println!("  Time:       {:.1}s", result.elapsed.as_secs_f64());

    if result.status == RunStatus::Completed {
        if result.is_fully_accounted() {
            println!("{}", "All files accounted for".green());
        } else {
            println!(
                "{}",
                format!(
                    "Mismatch: {} files found but {} classified",
                    result.total_found,
                    result.accounted()
                )
                .yellow()
            );
        }
    }

    if let Some(html) = reports.iter().find(|p| p.extension().is_some_and(|e| e == "html")) {
        let absolute = html.canonicalize().unwrap_or_else(|_| html.clone());
        println!("Report: file://{}", absolute.display());
    } else if let Some(first) = reports.first() {
        println!("Report: {}", first.display());
    }
}
