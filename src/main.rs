//! bucketview - Browse a bucket as a cached directory tree.
//!
//! Usage:
//!   bucketview ls ROOT [PATH]      List one directory
//!   bucketview tree ROOT           Show every directory in the bucket
//!   bucketview cat ROOT PATH       Print a file (optionally a byte range)
//!   bucketview watch ROOT          Keep the tree fresh until Ctrl-C
//!   bucketview --help              Show help

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};
use itertools::Itertools;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use bucketview_cache::{FsCache, RefreshEvent, RefreshHandle, RefreshScheduler};
use bucketview_core::{BrowseConfig, path};
use bucketview_listing::{Listing, Sorter, decorate};
use bucketview_source::LocalObjectSource;

const MODIFIED_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Parser)]
#[command(
    name = "bucketview",
    version,
    about = "Browse a bucket as a cached directory tree",
    long_about = "bucketview lists every object in a bucket once, rebuilds the \
                  directory tree the keys imply, and serves lookups from that \
                  cached tree.\n\n\
                  A local directory stands in for the bucket: each file is an \
                  object keyed by its relative path."
)]
struct Cli {
    /// Log build and refresh details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List one directory
    Ls {
        /// Directory backing the bucket
        root: PathBuf,

        /// Directory to list
        #[arg(default_value = "/")]
        path: String,

        /// Folder ordering: none, plain, case-insensitive, semver
        #[arg(short, long, default_value = "none")]
        sort: String,

        /// Reverse the folder ordering
        #[arg(short, long)]
        reverse: bool,

        /// Apply per-directory customization documents
        #[arg(short, long)]
        customize: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Show every directory in the bucket
    Tree {
        /// Directory backing the bucket
        root: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Print a file to stdout
    Cat {
        /// Directory backing the bucket
        root: PathBuf,

        /// File to print
        path: String,

        /// Byte range (e.g., "bytes=0-99", "100-", "-20")
        #[arg(long)]
        range: Option<String>,
    },

    /// Refresh on a timer and on each line read from stdin
    Watch {
        /// Directory backing the bucket
        root: PathBuf,

        /// Time between refreshes (e.g., "30s", "5m", "1h")
        #[arg(short, long, default_value = "5m")]
        interval: String,

        /// Apply per-directory customization documents
        #[arg(short, long)]
        customize: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Ls {
            root,
            path,
            sort,
            reverse,
            customize,
            format,
        } => {
            run_ls(&root, &path, &sort, reverse, customize, format, cli.verbose)?;
        }
        Command::Tree { root, format } => {
            run_tree(&root, format)?;
        }
        Command::Cat { root, path, range } => {
            run_cat(&root, &path, range.as_deref())?;
        }
        Command::Watch {
            root,
            interval,
            customize,
        } => {
            run_watch(&root, &interval, customize, cli.verbose)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_writer(std::io::stderr)
        .init();
}

/// Create a cache over a local directory.
fn open_cache(root: &Path, config: &BrowseConfig) -> Result<FsCache> {
    let root = root.canonicalize().context("Invalid path")?;
    let source = LocalObjectSource::new(root);
    Ok(FsCache::new(Arc::new(source), config))
}

/// Create a cache and run one refresh.
fn load_cache(root: &Path, config: &BrowseConfig) -> Result<FsCache> {
    let cache = open_cache(root, config)?;

    eprintln!("Listing {}...", root.display());
    let summary = cache.refresh().context("Refresh failed")?;
    if summary.warnings > 0 {
        eprintln!("{} warning(s) during listing", summary.warnings);
    }

    Ok(cache)
}

/// List one directory.
fn run_ls(
    root: &Path,
    dir_path: &str,
    sort: &str,
    reverse: bool,
    customize: bool,
    format: OutputFormat,
    verbose: bool,
) -> Result<()> {
    let sorter = Sorter::from_name(sort, reverse).context("Invalid sort options")?;
    let config = BrowseConfig::builder()
        .sort(sorter.algorithm())
        .reverse(reverse)
        .customize(customize)
        .debug(verbose)
        .build()?;

    let cache = load_cache(root, &config)?;
    let dir = cache
        .get_dir(dir_path)
        .ok_or_else(|| eyre!("No such directory: {dir_path}"))?;
    let listing = decorate(&dir, &sorter);

    match format {
        OutputFormat::Text => print_listing(&listing),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&listing)?),
    }

    Ok(())
}

fn print_listing(listing: &Listing) {
    let trail = listing.breadcrumbs.iter().map(|c| c.name.as_str()).join(" / ");

    println!();
    println!("{}", "─".repeat(70));
    println!(" {trail}");
    println!(
        " {} folders, {} files",
        listing.folders.len(),
        listing.files.len()
    );
    println!("{}", "─".repeat(70));

    if listing.is_empty() {
        println!(" (empty)");
    }

    for folder in &listing.folders {
        println!(
            " {:<10} {:<40} {}{}",
            format!("[{}]", folder.icon),
            truncate(&format!("{}/", folder.name), 40),
            folder.description,
            if folder.latest { " *" } else { "" }
        );
    }

    for file in &listing.files {
        println!(
            " {:<10} {:<40} {:>10}  {}",
            format!("[{}]", file.icon),
            truncate(&file.name, 40),
            file.human_size,
            file.modified.format(MODIFIED_FORMAT)
        );
    }
    println!();
}

/// Show every directory in the bucket.
fn run_tree(root: &Path, format: OutputFormat) -> Result<()> {
    let cache = load_cache(root, &BrowseConfig::default())?;
    let tree = cache.snapshot();

    match format {
        OutputFormat::Text => {
            println!();
            println!("{}", "─".repeat(60));
            println!(" {} - {}", root.display(), format_size(tree.stats.total_size));
            println!(
                " {} files, {} directories ({} markers)",
                tree.stats.total_files, tree.stats.total_dirs, tree.stats.dir_markers
            );
            println!(" Listed in {:.2}s", tree.build_duration.as_secs_f64());
            println!("{}", "─".repeat(60));
            println!();

            for dir_path in tree.paths() {
                let Some(dir) = tree.dir(dir_path) else {
                    continue;
                };
                let depth = path::segments(dir_path).count();
                let indent = "  ".repeat(depth);
                let name = if dir.is_root() { "/" } else { dir.name() };
                println!(
                    "{}{:<40} {:>4} folders {:>6} files {:>10}",
                    indent,
                    truncate(name, 40),
                    dir.subfolders.len(),
                    dir.files.len(),
                    format_size(dir.total_size())
                );
            }

            if tree.has_warnings() {
                println!();
                println!("{} warning(s) during listing", tree.warnings.len());
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(tree.as_ref())?);
        }
    }

    Ok(())
}

/// Print a file, or a range of it, to stdout.
fn run_cat(root: &Path, file_path: &str, range: Option<&str>) -> Result<()> {
    let cache = load_cache(root, &BrowseConfig::default())?;
    let file = cache
        .get_file(file_path)
        .ok_or_else(|| eyre!("No such file: {file_path}"))?;

    let normalized = path::normalize(file_path);
    let key = normalized.trim_start_matches('/');
    tracing::debug!(key, size = file.size, "reading object");

    let body = cache
        .source()
        .get_object(key, range)
        .with_context(|| format!("Could not read {key}"))?;
    if let Some(content_range) = &body.content_range {
        eprintln!("Content-Range: {content_range}");
    }

    let mut reader = body.reader;
    let mut stdout = std::io::stdout().lock();
    std::io::copy(&mut reader, &mut stdout)?;
    stdout.flush()?;

    Ok(())
}

/// Keep the tree fresh until Ctrl-C.
fn run_watch(root: &Path, interval: &str, customize: bool, verbose: bool) -> Result<()> {
    let interval = parse_duration(interval)?;
    let config = BrowseConfig::builder()
        .refresh_interval(interval)
        .customize(customize)
        .debug(verbose)
        .build()?;
    let cache = Arc::new(open_cache(root, &config)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    run_until_stopped(runtime, async move {
        let handle = RefreshScheduler::new(Arc::clone(&cache), config.refresh_interval).spawn();
        handle.request_refresh();

        eprintln!(
            "Watching {} (every {:?}); press Enter to refresh, Ctrl-C to stop",
            root.display(),
            config.refresh_interval
        );

        let lines = BufReader::new(tokio::io::stdin()).lines();
        watch_loop(&handle, lines, tokio::signal::ctrl_c()).await;

        handle.shutdown().await;
        eprintln!("Stopped after {} refresh(es)", cache.generation());
    });

    Ok(())
}

/// How long runtime shutdown waits for blocking tasks such as a stdin read.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

/// Drive `future` to completion, then shut the runtime down without
/// waiting on blocking reads that may never return.
fn run_until_stopped<F: Future>(runtime: tokio::runtime::Runtime, future: F) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(SHUTDOWN_GRACE);
    output
}

/// Request a refresh per input line and print refresh events until `stop`
/// resolves. Input reaching EOF does not end the loop.
async fn watch_loop<R, S>(handle: &RefreshHandle, mut lines: Lines<R>, stop: S)
where
    R: AsyncBufRead + Unpin,
    S: Future,
{
    let mut events = handle.subscribe();
    let mut input_open = true;
    tokio::pin!(stop);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            line = lines.next_line(), if input_open => match line {
                Ok(Some(_)) => handle.request_refresh(),
                Ok(None) => input_open = false,
                Err(err) => {
                    tracing::warn!(error = %err, "stdin closed");
                    input_open = false;
                }
            },
            event = events.recv() => match event {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(missed)) => eprintln!("missed {missed} refresh event(s)"),
                Err(RecvError::Closed) => break,
            },
        }
    }
}

fn print_event(event: &RefreshEvent) {
    let now = chrono::Local::now().format("%H:%M:%S");
    match &event.outcome {
        Ok(summary) => println!(
            "{now} [{:?}] generation {}: {} files, {} directories, {} in {:.2}s",
            event.trigger,
            summary.generation,
            summary.stats.total_files,
            summary.stats.total_dirs,
            format_size(summary.stats.total_size),
            summary.duration.as_secs_f64()
        ),
        Err(message) => println!("{now} [{:?}] refresh failed: {message}", event.trigger),
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to max length.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len - 1).collect();
        format!("{head}…")
    }
}

/// Parse a duration string (e.g., "30s", "5m", "1h", "1d").
fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num, multiplier) = if let Some(n) = s.strip_suffix('d') {
        (n.parse::<f64>()?, 24.0 * 60.0 * 60.0)
    } else if let Some(n) = s.strip_suffix('h') {
        (n.parse::<f64>()?, 60.0 * 60.0)
    } else if let Some(n) = s.strip_suffix("ms") {
        (n.parse::<f64>()?, 0.001)
    } else if let Some(n) = s.strip_suffix('m') {
        (n.parse::<f64>()?, 60.0)
    } else if let Some(n) = s.strip_suffix('s') {
        (n.parse::<f64>()?, 1.0)
    } else {
        (s.parse::<f64>()?, 1.0) // Default to seconds
    };

    if !num.is_finite() || num <= 0.0 {
        return Err(eyre!("Interval must be positive: {s}"));
    }

    Ok(Duration::from_secs_f64(num * multiplier))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("90").unwrap(), Duration::from_secs(90));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_runtime_shutdown_does_not_wait_for_blocked_reads() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let (_keep_open, never) = std::sync::mpsc::channel::<()>();

        let started = std::time::Instant::now();
        run_until_stopped(runtime, async move {
            let _blocked = tokio::task::spawn_blocking(move || never.recv());
            tokio::task::yield_now().await;
        });

        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_watch_loop_stops_while_input_is_open() {
        let source = bucketview_source::MemoryObjectSource::default();
        let cache = Arc::new(FsCache::new(Arc::new(source), &BrowseConfig::default()));
        let handle = RefreshScheduler::new(Arc::clone(&cache), Duration::from_secs(3600)).spawn();

        // Writer stays alive, so the reader never sees EOF.
        let (_writer, reader) = tokio::io::duplex(64);
        let lines = BufReader::new(reader).lines();

        tokio::time::timeout(
            Duration::from_secs(5),
            watch_loop(&handle, lines, tokio::time::sleep(Duration::from_millis(20))),
        )
        .await
        .unwrap();

        handle.shutdown().await;
    }

    #[tokio::test]
    async fn test_watch_loop_requests_refresh_per_line() {
        let source = Arc::new(bucketview_source::MemoryObjectSource::default());
        source.put("a.txt", "a");
        let cache = Arc::new(FsCache::new(source, &BrowseConfig::default()));
        let handle = RefreshScheduler::new(Arc::clone(&cache), Duration::from_secs(3600)).spawn();

        let input: &[u8] = b"\n";
        let lines = BufReader::new(input).lines();
        watch_loop(&handle, lines, tokio::time::sleep(Duration::from_millis(200))).await;

        assert_eq!(cache.generation(), 1);
        handle.shutdown().await;
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd…");
    }
}
