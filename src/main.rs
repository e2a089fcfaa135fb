//! dirindex - Incremental directory tree indexer.
//!
//! Usage:
//!   dirindex [OPTIONS] <ROOT>...      Index one or more trees into the catalog
//!   dirindex --retry <ROOT>           Re-evaluate entries that failed before
//!   dirindex --help                   Show help

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use dirindex_core::{ExclusionPatterns, IndexConfig, WalkSummary};
use dirindex_scan::{ProgressCounter, StatusReporter, TreeWalker, terminal_width};
use dirindex_store::{Catalog, SledCatalog};

#[derive(Parser)]
#[command(
    name = "dirindex",
    version,
    about = "Incremental directory tree indexer",
    long_about = "dirindex records every entry under the given roots in a catalog, \
                  hashing regular files with SHA-256.\n\n\
                  Files whose modification time is unchanged since the last run \
                  keep their stored hash, so re-indexing a large tree is cheap."
)]
struct Cli {
    /// Directories to index
    #[arg(required = true)]
    roots: Vec<PathBuf>,

    /// Catalog location
    #[arg(long, default_value = "index.db")]
    db: PathBuf,

    /// File with exclusion patterns, one per line
    #[arg(long)]
    exclude: Option<PathBuf>,

    /// Log file (appended to)
    #[arg(long, default_value = "errors.log")]
    log: PathBuf,

    /// Also print log output to stdout
    #[arg(long)]
    print_errors: bool,

    /// Seconds between status updates, 0 disables them
    #[arg(long, default_value = "1")]
    interval: u64,

    /// Retry entries that failed in an earlier run
    #[arg(long)]
    retry: bool,

    /// Follow symbolic links to files and directories
    #[arg(long)]
    follow_symlinks: bool,

    /// Log read and hash throughput for every hashed file
    #[arg(long)]
    measure_speed: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let log_path = std::path::absolute(&cli.log).context("Invalid log path")?;
    let _guard = init_logging(&log_path, cli.print_errors)?;

    let db_path = std::path::absolute(&cli.db).context("Invalid database path")?;
    let catalog = Arc::new(
        SledCatalog::open(&db_path)
            .wrap_err_with(|| format!("Failed to open catalog at {}", db_path.display()))?,
    );

    let mut exclusions = load_exclusions(cli.exclude.as_deref());
    // Never index our own output.
    exclusions.push(db_path.to_string_lossy());
    exclusions.push(log_path.to_string_lossy());

    let config = IndexConfig::builder()
        .follow_symlinks(cli.follow_symlinks)
        .retry_errors(cli.retry)
        .instrument_hashing(cli.measure_speed)
        .build()
        .context("Invalid configuration")?;

    let progress = Arc::new(ProgressCounter::new());
    let reporter = (cli.interval > 0).then(|| {
        StatusReporter::spawn(
            progress.clone(),
            Duration::from_secs(cli.interval),
            terminal_width(),
        )
    });

    let start = Instant::now();
    let walk = {
        let catalog = catalog.clone();
        let roots = cli.roots.clone();
        tokio::task::spawn_blocking(move || {
            let mut walker =
                TreeWalker::new(catalog.as_ref(), &config, progress).with_exclusions(exclusions);
            let mut total = WalkSummary::new();
            for root in &roots {
                match walker.walk(root) {
                    Ok(summary) => total += summary,
                    Err(err) => {
                        tracing::error!(root = %root.display(), error = %err, "skipping root");
                        eprintln!("Error indexing {}: {err}", root.display());
                    }
                }
            }
            total
        })
    };
    let summary = walk.await.context("Walk task failed")?;

    if let Some(reporter) = reporter {
        reporter.shutdown().await;
    }
    catalog.flush().context("Failed to flush catalog")?;

    print_summary(&summary, catalog.as_ref(), start.elapsed());
    Ok(())
}

/// Install the log subscriber. The returned guard flushes the file on drop.
fn init_logging(log_path: &Path, print_errors: bool) -> Result<WorkerGuard> {
    let dir = log_path.parent().unwrap_or(Path::new("."));
    let file_name = log_path
        .file_name()
        .ok_or_else(|| eyre!("Invalid log file: {}", log_path.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .wrap_err_with(|| format!("Failed to open log file {}", log_path.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false);

    let installed = if print_errors {
        builder.with_writer(writer.and(std::io::stdout)).try_init()
    } else {
        builder.with_writer(writer).try_init()
    };
    installed.map_err(|e| eyre!("Failed to install logger: {e}"))?;

    Ok(guard)
}

/// A missing or unreadable pattern file is reported and indexing goes on.
fn load_exclusions(path: Option<&Path>) -> ExclusionPatterns {
    let Some(path) = path else {
        return ExclusionPatterns::default();
    };

    match ExclusionPatterns::from_file(path) {
        Ok(patterns) => {
            tracing::info!(file = %path.display(), count = patterns.len(), "loaded exclusion patterns");
            patterns
        }
        Err(err) => {
            tracing::warn!(error = %err, "ignoring exclude file");
            eprintln!("Warning: {err}");
            ExclusionPatterns::default()
        }
    }
}

fn print_summary(summary: &WalkSummary, catalog: &dyn Catalog, elapsed: Duration) {
    println!();
    println!("{}", "─".repeat(60));
    println!(
        " Indexed {} entries in {:.2}s",
        summary.total_entries(),
        elapsed.as_secs_f64()
    );
    println!(
        " {} hashed ({}), {} unchanged",
        summary.hashed,
        format_size(summary.bytes_hashed),
        summary.unchanged
    );
    println!(
        " {} directories, {} symlinks, {} excluded",
        summary.dirs, summary.symlinks, summary.excluded
    );
    println!(
        " {} errors, {} skipped from earlier runs",
        summary.errors, summary.skipped_errors
    );
    if summary.symlink_loops > 0 {
        println!(" {} symlink loops not followed", summary.symlink_loops);
    }
    match (catalog.entry_count(), catalog.folder_count()) {
        (Ok(entries), Ok(folders)) => {
            println!(" Catalog holds {entries} entries in {folders} folders")
        }
        (Err(err), _) | (_, Err(err)) => tracing::warn!(error = %err, "could not count catalog"),
    }
    println!("{}", "─".repeat(60));
}

fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
