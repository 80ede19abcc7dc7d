//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use v2dl_core::config::Overrides;
use v2dl_core::ledger::LedgerPolicy;

/// Download albums from V2PH.
///
/// Accepts album URLs (`/album/...`) and listing URLs (`/actor/...`,
/// `/company/...`, `/category/...`, `/country/...`). Listings are expanded into
/// their albums; albums already in the ledger are skipped.
#[derive(Parser, Debug)]
#[command(name = "v2dl")]
#[command(author, version, about)]
pub struct Args {
    /// Album or listing URLs to download
    #[arg(required = true, value_name = "URL")]
    pub urls: Vec<String>,

    /// Walk pages and log what was found without downloading or touching the ledger
    #[arg(long)]
    pub dry_run: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Config file (default: $XDG_CONFIG_HOME/v2dl/config.toml)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Root folder for downloaded albums
    #[arg(short = 'd', long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Ledger of downloaded albums (default: <download-dir>/downloaded_albums.txt)
    #[arg(long, value_name = "PATH")]
    pub ledger: Option<PathBuf>,

    /// Download rate ceiling in KiB/s (0 to disable)
    #[arg(short = 'l', long, value_name = "KIB")]
    pub rate_limit: Option<u64>,

    /// Page render attempts before giving up (1-10)
    #[arg(short = 'r', long, value_parser = clap::value_parser!(u32).range(1..=10))]
    pub max_retries: Option<u32>,

    /// Minimum pause between page fetches, in seconds
    #[arg(long, value_name = "SECS")]
    pub page_delay_min: Option<f64>,

    /// Maximum pause between page fetches, in seconds
    #[arg(long, value_name = "SECS")]
    pub page_delay_max: Option<f64>,

    /// When albums are written to the ledger
    #[arg(long, value_enum)]
    pub ledger_policy: Option<LedgerPolicy>,

    /// Site base URL used to resolve relative links
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,
}

impl Args {
    /// Values that override the config file.
    #[must_use]
    pub fn overrides(&self) -> Overrides {
        Overrides {
            download_dir: self.download_dir.clone(),
            ledger: self.ledger.clone(),
            rate_limit: self.rate_limit,
            max_retries: self.max_retries,
            page_delay_min_secs: self.page_delay_min,
            page_delay_max_secs: self.page_delay_max,
            ledger_policy: self.ledger_policy,
            base_url: self.base_url.clone(),
            dry_run: self.dry_run,
        }
    }
}
