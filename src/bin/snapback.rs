//! Binary entry point for the `snapback` CLI.
//!
//! This binary is a thin wrapper: it parses flags, builds a progress
//! reporter that prints one line per stage event when `--verbose` is
//! set, and maps [`snapback::run_backup`]'s boolean result onto an
//! exit code. All backup logic lives in the library crate.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;
use snapback::{Config, ProgressEvent};

/// Incremental, snapshot-based file backup engine.
#[derive(Parser, Debug)]
#[command(name = "snapback", version, about)]
struct Cli {
    /// Source directory or file to back up.
    #[arg(short, long, value_name = "PATH")]
    source: PathBuf,

    /// Backup root; `backup/`, `deleted/`, and the catalogue are created under it.
    #[arg(short, long, value_name = "PATH")]
    backup: PathBuf,

    /// Print one line per file processed.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let cli = Cli::parse();

    let verbose = cli.verbose;
    let reporter: Option<snapback::ProgressReporter> = if verbose {
        Some(Box::new(move |event: &ProgressEvent| {
            println!("[{}] {} ({})", event.stage, event.file.display(), event.processed);
        }))
    } else {
        None
    };

    let config = Config {
        source_dir: cli.source,
        backup_root: cli.backup.clone(),
        catalogue_location: cli.backup.join("backup.db"),
        verbose,
        progress_reporter: reporter,
    };

    info!("starting backup into {}", config.backup_root.display());

    if snapback::run_backup(config) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
