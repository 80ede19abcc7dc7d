//! Configuration: the optional TOML file, CLI overrides, and the resolved [`Settings`].
//!
//! Priority, highest first: command-line flags, config file, built-in defaults.
//! Relative paths in the file resolve against the file's own directory; a
//! leading `~` expands to `$HOME`.
//!
//! ```toml
//! download_dir = "~/Downloads/v2dl"
//! rate_limit = 400           # KiB/s, 0 disables
//! max_retries = 3
//! page_delay_min_secs = 1.0
//! page_delay_max_secs = 5.0
//! ledger_policy = "on-enqueue"
//! ```

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::download::constants::{
    DEFAULT_PAGE_DELAY_MAX_SECS, DEFAULT_PAGE_DELAY_MIN_SECS, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_RATE_LIMIT_KIB,
};
use crate::download::ByteRateLimit;
use crate::fetch::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_JITTER, RetryPolicy};
use crate::ledger::{DEFAULT_LEDGER_FILE, LedgerPolicy};
use crate::walker::PageDelay;

/// Site scraped when no base URL is configured.
pub const DEFAULT_BASE_URL: &str = "https://www.v2ph.com";

/// Directory name under the platform config dir.
const CONFIG_DIR_NAME: &str = "v2dl";

/// Config file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file '{path}': {source}")]
    Io {
        /// Config path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid TOML or has unknown keys.
    #[error("failed to parse config file '{path}': {source}")]
    Toml {
        /// Config path.
        path: PathBuf,
        /// The parse error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Contents of the TOML config file. Every key is optional; unknown keys are rejected.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Root folder for downloaded albums.
    pub download_dir: Option<PathBuf>,
    /// Ledger file path.
    pub ledger: Option<PathBuf>,
    /// Transfer ceiling in KiB/s; 0 disables throttling.
    pub rate_limit: Option<u64>,
    /// Render attempts per page.
    pub max_retries: Option<u32>,
    /// Fixed backoff between attempts, seconds.
    pub retry_base_delay_secs: Option<f64>,
    /// Upper bound of random backoff jitter, seconds.
    pub retry_max_jitter_secs: Option<f64>,
    /// Lower bound of the pause between pages, seconds.
    pub page_delay_min_secs: Option<f64>,
    /// Upper bound of the pause between pages, seconds.
    pub page_delay_max_secs: Option<f64>,
    /// When albums are written to the ledger.
    pub ledger_policy: Option<LedgerPolicy>,
    /// Site base URL used to resolve relative links.
    pub base_url: Option<String>,
    /// Download queue capacity.
    pub queue_capacity: Option<usize>,
    /// Default log filter (e.g. "info", "v2dl_core=debug").
    pub log_level: Option<String>,
    /// Optional log file receiving a copy of all log lines.
    pub log_file: Option<PathBuf>,
}

impl FileConfig {
    /// Parses TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Toml`] for syntax errors or unknown keys.
    pub fn from_toml_str(raw: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|source| ConfigError::Toml {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Makes every relative path absolute against `base_dir`.
    #[must_use]
    pub fn resolve_paths(mut self, base_dir: &Path) -> Self {
        self.download_dir = self.download_dir.map(|p| resolve_path(&p, base_dir));
        self.ledger = self.ledger.map(|p| resolve_path(&p, base_dir));
        self.log_file = self.log_file.map(|p| resolve_path(&p, base_dir));
        self
    }
}

/// A config file that was found and parsed.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// Where the file was read from.
    pub path: PathBuf,
    /// Parsed contents with paths resolved.
    pub config: FileConfig,
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--download-dir`
    pub download_dir: Option<PathBuf>,
    /// `--ledger`
    pub ledger: Option<PathBuf>,
    /// `--rate-limit`
    pub rate_limit: Option<u64>,
    /// `--max-retries`
    pub max_retries: Option<u32>,
    /// `--page-delay-min`
    pub page_delay_min_secs: Option<f64>,
    /// `--page-delay-max`
    pub page_delay_max_secs: Option<f64>,
    /// `--ledger-policy`
    pub ledger_policy: Option<LedgerPolicy>,
    /// `--base-url`
    pub base_url: Option<String>,
    /// `--dry-run`
    pub dry_run: bool,
}

/// Fully resolved run configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// Root folder for downloaded albums.
    pub download_dir: PathBuf,
    /// Ledger file path.
    pub ledger_path: PathBuf,
    /// Transfer ceiling in KiB/s; 0 disables throttling.
    pub rate_limit_kib: u64,
    /// Render attempts per page.
    pub max_attempts: u32,
    /// Fixed backoff between attempts, seconds.
    pub retry_base_delay_secs: f64,
    /// Upper bound of random backoff jitter, seconds.
    pub retry_max_jitter_secs: f64,
    /// Lower bound of the pause between pages, seconds.
    pub page_delay_min_secs: f64,
    /// Upper bound of the pause between pages, seconds.
    pub page_delay_max_secs: f64,
    /// When albums are written to the ledger.
    pub ledger_policy: LedgerPolicy,
    /// Site base URL used to resolve relative links.
    pub base_url: String,
    /// Download queue capacity.
    pub queue_capacity: usize,
    /// Walk and log only; no ledger writes, no downloads.
    pub dry_run: bool,
    /// Log filter from the config file.
    pub log_level: Option<String>,
    /// Log file from the config file.
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self::with_download_dir(default_download_dir())
    }
}

impl Settings {
    /// Defaults with a specific download directory; the ledger lives inside it.
    #[must_use]
    pub fn with_download_dir(download_dir: impl Into<PathBuf>) -> Self {
        let download_dir = download_dir.into();
        Self {
            ledger_path: download_dir.join(DEFAULT_LEDGER_FILE),
            download_dir,
            rate_limit_kib: DEFAULT_RATE_LIMIT_KIB,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_base_delay_secs: DEFAULT_BASE_DELAY.as_secs_f64(),
            retry_max_jitter_secs: DEFAULT_MAX_JITTER.as_secs_f64(),
            page_delay_min_secs: DEFAULT_PAGE_DELAY_MIN_SECS,
            page_delay_max_secs: DEFAULT_PAGE_DELAY_MAX_SECS,
            ledger_policy: LedgerPolicy::default(),
            base_url: DEFAULT_BASE_URL.to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            dry_run: false,
            log_level: None,
            log_file: None,
        }
    }

    /// Layers defaults, then the file, then CLI overrides.
    #[must_use]
    pub fn resolve(file: Option<&FileConfig>, overrides: &Overrides) -> Self {
        let empty = FileConfig::default();
        let file = file.unwrap_or(&empty);

        let download_dir = overrides
            .download_dir
            .clone()
            .or_else(|| file.download_dir.clone())
            .unwrap_or_else(default_download_dir);
        let mut settings = Self::with_download_dir(download_dir);

        if let Some(ledger) = overrides.ledger.clone().or_else(|| file.ledger.clone()) {
            settings.ledger_path = ledger;
        }
        if let Some(v) = overrides.rate_limit.or(file.rate_limit) {
            settings.rate_limit_kib = v;
        }
        if let Some(v) = overrides.max_retries.or(file.max_retries) {
            settings.max_attempts = v;
        }
        if let Some(v) = file.retry_base_delay_secs {
            settings.retry_base_delay_secs = v;
        }
        if let Some(v) = file.retry_max_jitter_secs {
            settings.retry_max_jitter_secs = v;
        }
        if let Some(v) = overrides.page_delay_min_secs.or(file.page_delay_min_secs) {
            settings.page_delay_min_secs = v;
        }
        if let Some(v) = overrides.page_delay_max_secs.or(file.page_delay_max_secs) {
            settings.page_delay_max_secs = v;
        }
        if let Some(v) = overrides.ledger_policy.or(file.ledger_policy) {
            settings.ledger_policy = v;
        }
        if let Some(v) = overrides.base_url.clone().or_else(|| file.base_url.clone()) {
            settings.base_url = v;
        }
        if let Some(v) = file.queue_capacity {
            settings.queue_capacity = v;
        }
        settings.dry_run = overrides.dry_run;
        settings.log_level.clone_from(&file.log_level);
        settings.log_file.clone_from(&file.log_file);

        debug!(?settings, "settings resolved");
        settings
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "max_retries must be at least 1".into(),
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::Validation(
                "queue_capacity must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("retry_base_delay_secs", self.retry_base_delay_secs),
            ("retry_max_jitter_secs", self.retry_max_jitter_secs),
            ("page_delay_min_secs", self.page_delay_min_secs),
            ("page_delay_max_secs", self.page_delay_max_secs),
        ] {
            if Duration::try_from_secs_f64(value).is_err() {
                return Err(ConfigError::Validation(format!(
                    "{name} must be a non-negative number of seconds, got {value}"
                )));
            }
        }
        if self.page_delay_min_secs > self.page_delay_max_secs {
            return Err(ConfigError::Validation(format!(
                "page delay minimum ({}) exceeds maximum ({})",
                self.page_delay_min_secs, self.page_delay_max_secs
            )));
        }
        match Url::parse(&self.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            _ => Err(ConfigError::Validation(format!(
                "base_url '{}' is not an http(s) URL",
                self.base_url
            ))),
        }
    }

    /// Retry policy built from these settings.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            secs(self.retry_base_delay_secs),
            secs(self.retry_max_jitter_secs),
        )
    }

    /// Page pacing built from these settings.
    #[must_use]
    pub fn page_delay(&self) -> PageDelay {
        PageDelay::new(secs(self.page_delay_min_secs), secs(self.page_delay_max_secs))
    }

    /// Transfer ceiling built from these settings.
    #[must_use]
    pub fn rate_limit(&self) -> ByteRateLimit {
        ByteRateLimit::from_kib_per_sec(self.rate_limit_kib)
    }

    /// Parsed base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the URL does not parse.
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|e| {
            ConfigError::Validation(format!("base_url '{}' is invalid: {e}", self.base_url))
        })
    }
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

/// Resolves the default config path.
///
/// Priority:
/// 1. `$XDG_CONFIG_HOME/v2dl/config.toml`
/// 2. `$HOME/.config/v2dl/config.toml`
#[must_use]
pub fn resolve_default_config_path() -> Option<PathBuf> {
    if let Some(xdg_config_home) = env_var_non_empty_os("XDG_CONFIG_HOME") {
        return Some(
            PathBuf::from(xdg_config_home)
                .join(CONFIG_DIR_NAME)
                .join(CONFIG_FILE_NAME),
        );
    }

    let home = env_var_non_empty_os("HOME")?;
    Some(
        PathBuf::from(home)
            .join(".config")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME),
    )
}

/// Default download root: `$HOME/Downloads/v2dl`, or `./v2dl` without a home.
#[must_use]
pub fn default_download_dir() -> PathBuf {
    env_var_non_empty_os("HOME").map_or_else(
        || PathBuf::from(CONFIG_DIR_NAME),
        |home| PathBuf::from(home).join("Downloads").join(CONFIG_DIR_NAME),
    )
}

fn env_var_non_empty_os(name: &str) -> Option<OsString> {
    let value = env::var_os(name)?;
    if value.is_empty() { None } else { Some(value) }
}

/// Loads the config file.
///
/// An explicit path must exist. The default path is optional: when it is
/// absent `Ok(None)` is returned.
///
/// # Errors
///
/// Returns [`ConfigError`] when a file exists but cannot be read or parsed,
/// or when an explicit path is missing.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<LoadedConfig>, ConfigError> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => match resolve_default_config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(None),
        },
    };

    let raw = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
        path: path.clone(),
        source,
    })?;
    let base_dir = path
        .parent()
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    let config = FileConfig::from_toml_str(&raw, &path)?.resolve_paths(&base_dir);
    debug!(path = %path.display(), "config file loaded");
    Ok(Some(LoadedConfig { path, config }))
}

fn resolve_path(path: &Path, base_dir: &Path) -> PathBuf {
    let expanded = expand_home(path);
    if expanded.is_absolute() {
        expanded
    } else {
        base_dir.join(expanded)
    }
}

fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match env_var_non_empty_os("HOME") {
        Some(home) => PathBuf::from(home).join(rest),
        None => path.to_path_buf(),
    }
}
