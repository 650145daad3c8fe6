//! Index command: dedup index statistics.

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::Args;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::index::{DedupIndex, SqliteIndex};

/// Arguments for the index command
#[derive(Args)]
pub struct IndexArgs {
    /// Destination root holding the index
    #[arg(long, required_unless_present = "db")]
    pub dest: Option<PathBuf>,

    /// Index file path
    #[arg(long)]
    pub db: Option<PathBuf>,
}

/// Run the index command
pub async fn run(args: IndexArgs, config: AppConfig) -> Result<()> {
    let path = match (args.db, args.dest) {
        (Some(db), _) => db,
        (None, Some(dest)) => dest.join(&config.backup.index_file_name),
        (None, None) => bail!("either --dest or --db is required"),
    };

    if !path.is_file() {
        bail!("No dedup index at {}", path.display());
    }

    let algorithm = SqliteIndex::stored_algorithm(&path)?.unwrap_or(config.backup.hash_algorithm);
    let mut index = SqliteIndex::open(&path, algorithm)
        .with_context(|| format!("Failed to open dedup index {}", path.display()))?;

    println!("Dedup index: {}", path.display());
    println!("  Records:   {}", index.len());
    println!("  Algorithm: {}", index.algorithm());
    match index.last_run() {
        Some(started) => println!(
            "  Last run:  {}",
            started.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        ),
        None => println!("  Last run:  never"),
    }

    index.close()?;
    Ok(())
}
