//! # isnapshot CLI - Incremental Snapshot
//!
//! Copies changed files and symlinks unchanged files to the previous
//! snapshot, giving an always-available incremental backup with minimal
//! wasted space. Meant to be run from cron or by hand.
//!
//! ## Usage
//! ```bash
//! # Snapshot two directories into /backup
//! isnapshot ~/work ~/notes /backup
//!
//! # Full copy, skipping editor swap files, with a byte count
//! isnapshot --full --count-bytes --exclude '*.swp' ~/work /backup
//!
//! # ISO-style snapshot names
//! isnapshot -d '%Y-%m-%dT%H%M%S' ~/work /backup
//! ```

use clap::error::ErrorKind;
use clap::Parser;
use colored::*;
use humantime::format_duration;
use isnapshot::types::DEFAULT_DATE_FORMAT;
use isnapshot::utils::format_bytes;
use isnapshot::{Result, SnapshotError, SnapshotReport, SnapshotterBuilder};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Incremental Snapshot - copy what changed, link what didn't
#[derive(Parser, Debug)]
#[command(name = "isnapshot")]
#[command(version)]
#[command(about = "Incremental directory snapshots that symlink unchanged files into the previous snapshot")]
#[command(override_usage = "isnapshot [OPTIONS] SOURCE... DESTINATION")]
struct Cli {
    /// Show verbose information
    #[arg(short, long)]
    verbose: bool,

    /// Perform full backup. Default is incremental
    #[arg(short, long)]
    full: bool,

    /// Count the number of bytes copied compared to total backup
    #[arg(short, long)]
    count_bytes: bool,

    /// Set backup folder date format
    #[arg(short, long, value_name = "FORMAT", default_value = DEFAULT_DATE_FORMAT)]
    date_format: String,

    /// Exclude files whose absolute path matches PATTERN from the snapshot
    #[arg(short, long, value_name = "PATTERN")]
    exclude: Option<String>,

    /// Source directories or files, followed by the destination root
    #[arg(value_name = "PATH", num_args = 1.., required = true)]
    paths: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            let _ = e.print();
            return ExitCode::FAILURE;
        }
    };

    // Set up logging
    let default_filter = if cli.verbose { "isnapshot=info" } else { "isnapshot=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Disable colors if needed
    if std::env::var("NO_COLOR").is_ok() {
        colored::control::set_override(false);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

/// Main command runner
fn run(cli: Cli) -> Result<()> {
    let mut paths = cli.paths;
    if paths.len() < 2 {
        return Err(SnapshotError::usage(
            "not enough arguments: expected SOURCE... DESTINATION",
        ));
    }
    let destination = paths.pop().ok_or_else(|| SnapshotError::usage("missing DESTINATION"))?;

    let mut builder = SnapshotterBuilder::new()
        .date_format(cli.date_format)
        .force_full_copy(cli.full)
        .count_bytes(cli.count_bytes);
    if let Some(pattern) = cli.exclude {
        builder = builder.exclude_pattern(pattern);
    }

    let snapshotter = builder.build(paths, destination)?;
    let report = snapshotter.snapshot()?;

    if cli.verbose {
        print_summary(&report, cli.count_bytes);
    }
    if cli.count_bytes {
        println!(
            "Copied {} of {} bytes total in backup.",
            report.stats.bytes_copied, report.stats.total_bytes
        );
    }

    Ok(())
}

/// Print a human-readable run summary
fn print_summary(report: &SnapshotReport, count_bytes: bool) {
    let stats = &report.stats;

    println!(
        "{} Created snapshot {}",
        "✓".green().bold(),
        report.snapshot_path.display().to_string().yellow().bold()
    );
    match &report.previous_snapshot {
        Some(previous) => println!("  Previous: {}", previous.display().to_string().cyan()),
        None => println!("  Previous: {}", "none (full copy)".dimmed()),
    }
    println!("  Copied: {}", stats.files_copied.to_string().cyan());
    println!("  Linked: {}", stats.files_linked.to_string().cyan());
    println!(
        "  Other: {} directories, {} symlinks, {} special files",
        stats.directories, stats.symlinks, stats.special_files
    );
    if stats.excluded > 0 {
        println!("  Excluded: {}", stats.excluded.to_string().dimmed());
    }
    if count_bytes {
        println!(
            "  Size: {} of {}",
            format_bytes(stats.bytes_copied).cyan(),
            format_bytes(stats.total_bytes).cyan()
        );
    }
    println!("  Time: {}", format_duration(report.duration).to_string().cyan());

    if stats.metadata_failures > 0 {
        println!(
            "\n{} {} metadata update(s) failed, see warnings above",
            "Warning:".yellow().bold(),
            stats.metadata_failures
        );
    }
}
