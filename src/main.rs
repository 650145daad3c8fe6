//! media-backup command-line entry point.

use anyhow::Result;
use clap::Parser;
use media_backup::cli::{Cli, Commands};
use media_backup::logging::{init_logging, init_logging_at};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;

    if cli.verbose {
        init_logging(true, cli.log_file.as_deref())?;
    } else {
        init_logging_at(&config.logging.level, cli.log_file.as_deref())?;
    }

    match cli.command {
        Commands::Backup(args) => media_backup::cli::backup::run(args, config).await,
        Commands::Index(args) => media_backup::cli::index::run(args, config).await,
    }
}
