//! CLI entry point for v2dl.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};
use v2dl_core::config::{Settings, load_config};
use v2dl_core::download::RateLimitedTransfer;
use v2dl_core::fetch::HttpRenderSession;
use v2dl_core::orchestrator::Orchestrator;
use v2dl_core::parser::parse_targets;

mod cli;

use cli::Args;

/// Exit status when not a single target produced anything.
const EXIT_ALL_TARGETS_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let loaded = load_config(args.config.as_deref()).context("Cannot load configuration")?;
    let settings = Settings::resolve(loaded.as_ref().map(|l| &l.config), &args.overrides());
    settings.validate().context("Invalid configuration")?;

    init_tracing(&args, &settings)?;

    debug!(?args, "CLI arguments parsed");
    if let Some(loaded) = &loaded {
        info!(path = %loaded.path.display(), "Loaded config file");
    }
    info!(
        download_dir = %settings.download_dir.display(),
        ledger = %settings.ledger_path.display(),
        rate_limit_kib = settings.rate_limit_kib,
        ledger_policy = %settings.ledger_policy,
        dry_run = settings.dry_run,
        "v2dl starting"
    );

    let parsed = parse_targets(&args.urls);
    if parsed.is_empty() {
        bail!(
            "No supported URLs given ({} rejected)\n  \
            Expected album URLs (/album/...) or listings (/actor/, /company/, /category/, /country/).",
            parsed.rejected.len()
        );
    }
    if !parsed.rejected.is_empty() {
        warn!(
            rejected = parsed.rejected.len(),
            accepted = parsed.targets.len(),
            "Some URLs were rejected"
        );
    }

    let session = HttpRenderSession::new().context("Cannot build HTTP client for pages")?;
    let transfer = RateLimitedTransfer::new(&settings.download_dir, settings.rate_limit())
        .context("Cannot build HTTP client for downloads")?;
    let orchestrator = Orchestrator::new(settings, Arc::new(session), transfer)
        .context("Invalid configuration")?;

    let summary = orchestrator.run(&parsed.targets).await;

    if summary.all_targets_failed() {
        warn!(targets = summary.targets, "Every target failed");
        return Ok(ExitCode::from(EXIT_ALL_TARGETS_FAILED));
    }
    Ok(ExitCode::SUCCESS)
}

/// Installs the subscriber.
///
/// Priority: RUST_LOG env var > quiet flag > verbose flag > config `log_level` > info.
fn init_tracing(args: &Args, settings: &Settings) -> Result<()> {
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => settings.log_level.as_deref().unwrap_or("info"),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .with_context(|| format!("Invalid log level '{default_level}'"))?;

    let file_layer = match &settings.log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(open_log_file(path)?)),
        ),
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create log directory '{}'", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open log file '{}'", path.display()))
}
