//! Rate-limited media transfer.
//!
//! Items are fetched one at a time into `<root>/<album folder>/<caption><ext>`.
//! Each body streams into a `.part` file that is renamed into place only after
//! the last byte is flushed, so an existing final file always means a complete
//! download and re-runs skip it without a request.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, REFERER};
use tokio::fs::File;
use tokio::io::BufWriter;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::constants::{
    ACCEPT_LANGUAGE as ACCEPT_LANGUAGE_VALUE, CONNECT_TIMEOUT_SECS, MEDIA_ACCEPT,
    READ_TIMEOUT_SECS,
};
use super::error::TransferError;
use super::filename::media_filename;
use super::task::{DownloadTask, ItemOutcome, TaskHandler, TaskReport};
use super::throttle::{ByteRateLimit, CopyError, throttled_copy};
use crate::parser::MediaRef;
use crate::user_agent;

/// Suffix of in-progress downloads.
const PART_SUFFIX: &str = ".part";

/// Sequential media downloader under a global byte-rate ceiling.
#[derive(Debug, Clone)]
pub struct RateLimitedTransfer {
    client: Client,
    root: PathBuf,
    limit: ByteRateLimit,
}

impl RateLimitedTransfer {
    /// Creates a transfer writing under `root` with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn new(root: impl Into<PathBuf>, limit: ByteRateLimit) -> Result<Self, reqwest::Error> {
        Self::with_timeouts(root, limit, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a transfer with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns the builder error if the TLS backend cannot be initialized.
    pub fn with_timeouts(
        root: impl Into<PathBuf>,
        limit: ByteRateLimit,
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(user_agent::browser_user_agent())
            .default_headers(media_headers())
            .build()?;
        Ok(Self {
            client,
            root: root.into(),
            limit,
        })
    }

    /// Transfers one item into `dir` under `file_name`.
    ///
    /// Never fails: errors are logged and reported as [`ItemOutcome::Failed`].
    #[instrument(skip(self, dir, referer), fields(url = %item.url))]
    pub async fn transfer_item(
        &self,
        dir: &Path,
        file_name: &str,
        item: &MediaRef,
        referer: Option<&str>,
    ) -> ItemOutcome {
        let dest = dir.join(file_name);
        if tokio::fs::try_exists(&dest).await.unwrap_or(false) {
            debug!(path = %dest.display(), "already on disk; skipping");
            return ItemOutcome::Skipped { path: dest };
        }

        match self.download(&item.url, &dest, referer).await {
            Ok(bytes) => {
                info!(path = %dest.display(), bytes, "media downloaded");
                ItemOutcome::Downloaded { path: dest, bytes }
            }
            Err(e) => {
                warn!(error = %e, "media download failed");
                ItemOutcome::Failed {
                    url: item.url.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn download(
        &self,
        url: &str,
        dest: &Path,
        referer: Option<&str>,
    ) -> Result<u64, TransferError> {
        Url::parse(url).map_err(|_| TransferError::invalid_url(url))?;

        let mut request = self.client.get(url);
        if let Some(referer) = referer {
            request = request.header(REFERER, referer);
        }
        let response = request
            .send()
            .await
            .map_err(|e| TransferError::network(url, e))?;
        if !response.status().is_success() {
            return Err(TransferError::http_status(url, response.status().as_u16()));
        }

        let part = part_path(dest);
        let file = File::create(&part)
            .await
            .map_err(|e| TransferError::io(&part, e))?;
        let mut writer = BufWriter::new(file);

        let copied = throttled_copy(response.bytes_stream(), &mut writer, self.limit).await;
        drop(writer);
        let bytes = match copied {
            Ok(bytes) => bytes,
            Err(e) => {
                discard_part(&part).await;
                return Err(match e {
                    CopyError::Source(source) => TransferError::network(url, source),
                    CopyError::Sink(source) => TransferError::io(&part, source),
                });
            }
        };

        if let Err(e) = tokio::fs::rename(&part, dest).await {
            discard_part(&part).await;
            return Err(TransferError::io(dest, e));
        }
        Ok(bytes)
    }
}

#[async_trait]
impl TaskHandler for RateLimitedTransfer {
    #[instrument(skip(self, task), fields(album = %task.album_id, folder = %task.folder, items = task.items.len()))]
    async fn handle(&self, task: &DownloadTask) -> Result<TaskReport, TransferError> {
        let dir = self.root.join(&task.folder);
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| TransferError::io(&dir, e))?;

        let mut report = TaskReport::default();
        let mut used_names = HashSet::new();
        for item in &task.items {
            let name = unique_name(&mut used_names, media_filename(&item.caption, &item.url));
            let outcome = self
                .transfer_item(&dir, &name, item, Some(&task.album_id))
                .await;
            report.record(&outcome);
        }

        info!(
            downloaded = report.downloaded,
            skipped = report.skipped,
            failed = report.failed,
            bytes = report.bytes,
            "album finished"
        );
        Ok(report)
    }
}

fn media_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(MEDIA_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));
    headers
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(PART_SUFFIX);
    dest.with_file_name(name)
}

/// Removes a partial file after a failed transfer. Returns false when it could not be removed.
async fn discard_part(part: &Path) -> bool {
    debug!(path = %part.display(), "removing partial file after error");
    match tokio::fs::remove_file(part).await {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %part.display(), error = %e, "failed to remove partial file");
            false
        }
    }
}

/// Returns `name`, or `stem_N.ext` (N from 2) when an earlier item of the
/// same task already claimed it. Deterministic for a given item order.
fn unique_name(used: &mut HashSet<String>, name: String) -> String {
    if used.insert(name.clone()) {
        return name;
    }
    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name.as_str(), ""),
    };
    let mut n = 2;
    loop {
        let candidate = format!("{stem}_{n}{ext}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
