//! flickr-sync: pull recent Flickr photos into Hugo content and assets.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use flickr_sync::config::Settings;
use flickr_sync::dedup::remove_duplicates;
use flickr_sync::ingest::{run_sync, SyncFlags};
use flickr_sync::metrics::Metrics;
use flickr_sync::DEFAULT_LOG_FILTER;

#[derive(Parser, Debug)]
#[command(name = "flickr-sync", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    sync: SyncArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch recent photos and write content files (default).
    Sync(SyncArgs),
    /// Remove duplicate content files, keeping the earliest-dated one.
    Dedupe {
        #[arg(long)]
        dry_run: bool,
        #[arg(long)]
        content_dir: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Default, Clone)]
struct SyncArgs {
    /// Re-process photos that already have a content file.
    #[arg(long)]
    force: bool,
    /// Read the local sample feed instead of Flickr; no image downloads.
    #[arg(long)]
    sample: bool,
    /// Like --sample, but download images.
    #[arg(long)]
    sample_images: bool,
    /// Log what would be written without touching the filesystem.
    #[arg(long)]
    dry_run: bool,
    #[arg(long)]
    low_quality: bool,
    #[arg(long)]
    skip_exif: bool,
    #[arg(long)]
    limit: Option<usize>,
    #[arg(long)]
    content_dir: Option<PathBuf>,
    #[arg(long)]
    assets_dir: Option<PathBuf>,
    /// Config file (TOML or JSON).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write Prometheus text exposition here when the run ends.
    #[arg(long)]
    metrics_file: Option<PathBuf>,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

async fn sync(args: SyncArgs) -> Result<()> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(limit) = args.limit {
        settings.limit = limit;
    }
    if let Some(dir) = args.content_dir {
        settings.content_dir = dir;
    }
    if let Some(dir) = args.assets_dir {
        settings.assets_dir = dir;
    }
    settings.low_quality |= args.low_quality;
    settings.skip_exif |= args.skip_exif;

    let metrics = match &args.metrics_file {
        Some(_) => Some(Metrics::init()?),
        None => None,
    };

    let flags = SyncFlags {
        force: args.force,
        dry_run: args.dry_run,
        sample: args.sample,
        sample_images: args.sample_images,
    };
    let result = run_sync(&settings, flags).await;

    if let (Some(m), Some(path)) = (&metrics, &args.metrics_file) {
        if let Err(e) = m.write_to(path) {
            tracing::warn!(error = ?e, "could not write metrics file");
        }
    }

    let summary = result?;
    println!(
        "seen {} / skipped {} / written {} / failed {} / images {}",
        summary.seen, summary.skipped, summary.written, summary.failed, summary.images_downloaded
    );
    Ok(())
}

fn dedupe(dry_run: bool, content_dir: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let dir = match content_dir {
        Some(d) => d,
        None => Settings::load(config.as_deref())?.content_dir,
    };
    let removed = remove_duplicates(&dir, dry_run)?;
    let verb = if dry_run { "would remove" } else { "removed" };
    println!("{verb} {} duplicate file(s)", removed.len());
    for f in removed {
        println!("  {f}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env when present; real environment wins.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Some(Command::Sync(args)) => sync(args).await,
        Some(Command::Dedupe {
            dry_run,
            content_dir,
            config,
        }) => dedupe(dry_run, content_dir, config),
        None => sync(cli.sync).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "flickr-sync failed");
            ExitCode::FAILURE
        }
    }
}
