//! Command-line interface for media-backup.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::AppConfig;

pub mod backup;
pub mod index;
pub mod prompt;

/// media-backup - incremental, deduplicating photo and video backup
#[derive(Parser)]
#[command(name = "media-backup")]
#[command(about = "Back up photos and videos into month folders, skipping files already copied")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Config file (default: the user config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Copy new photos and videos from a source folder into the destination
    Backup(backup::BackupArgs),
    /// Show dedup index statistics
    Index(index::IndexArgs),
}

impl Cli {
    pub fn load_config(&self) -> Result<AppConfig> {
        match &self.config {
            Some(path) => AppConfig::load_from(path)
                .with_context(|| format!("Failed to load config {}", path.display())),
            None => AppConfig::load().context("Failed to load config"),
        }
    }
}
