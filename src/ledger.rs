//! Persisted record of albums already handed to the downloader.
//!
//! The ledger is a flat text file holding one album identifier per line. It is
//! only ever appended to, and is re-read on every lookup so external edits
//! (deleting a line to force a re-download) take effect immediately.
//!
//! A single process is assumed to write the file; concurrent writers are not
//! coordinated.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Default ledger file name inside the download directory.
pub const DEFAULT_LEDGER_FILE: &str = "downloaded_albums.txt";

/// When an album is written to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum LedgerPolicy {
    /// As soon as its complete media list is handed to the download queue.
    #[default]
    OnEnqueue,
    /// Only after the worker has every one of its items on disk.
    OnCompletion,
}

impl fmt::Display for LedgerPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::OnEnqueue => "on-enqueue",
            Self::OnCompletion => "on-completion",
        })
    }
}

/// Errors from ledger file access.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Reading, creating or appending to the ledger failed.
    #[error("IO error on ledger {path}: {source}")]
    Io {
        /// Ledger path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl LedgerError {
    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Append-only set of processed album identifiers.
#[derive(Debug, Clone)]
pub struct DedupLedger {
    path: PathBuf,
}

impl DedupLedger {
    /// Opens (lazily) the ledger at `path`. The file need not exist yet.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All identifiers in file order. A missing file is an empty ledger.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the file exists but cannot be read.
    pub async fn entries(&self) -> Result<Vec<String>, LedgerError> {
        Ok(parse_entries(&self.read().await?))
    }

    /// Returns true if `album_id` has been recorded.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] if the file exists but cannot be read.
    #[instrument(skip(self), fields(ledger = %self.path.display()))]
    pub async fn seen(&self, album_id: &str) -> Result<bool, LedgerError> {
        let contents = self.read().await?;
        Ok(contains(&contents, album_id))
    }

    /// Appends `album_id`, unless already present.
    ///
    /// Returns `true` when a line was written. The line goes out in a single
    /// write on a file opened in append mode; missing parent directories are
    /// created.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Io`] on any filesystem failure.
    #[instrument(skip(self), fields(ledger = %self.path.display()))]
    pub async fn record(&self, album_id: &str) -> Result<bool, LedgerError> {
        let contents = self.read().await?;
        if contains(&contents, album_id) {
            debug!("album already recorded");
            return Ok(false);
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::io(parent, e))?;
        }

        // A hand-edited file may lack its trailing newline.
        let line = if contents.is_empty() || contents.ends_with('\n') {
            format!("{album_id}\n")
        } else {
            format!("\n{album_id}\n")
        };

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| LedgerError::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| LedgerError::io(&self.path, e))?;
        file.flush()
            .await
            .map_err(|e| LedgerError::io(&self.path, e))?;

        debug!("album recorded");
        Ok(true)
    }

    async fn read(&self) -> Result<String, LedgerError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(LedgerError::io(&self.path, e)),
        }
    }
}

fn parse_entries(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains(contents: &str, album_id: &str) -> bool {
    let album_id = album_id.trim();
    contents.lines().any(|line| line.trim() == album_id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ALBUM: &str = "https://www.v2ph.com/album/YTY-7173";

    #[tokio::test]
    async fn test_missing_file_is_empty_ledger() {
        let dir = TempDir::new().unwrap();
        let ledger = DedupLedger::new(dir.path().join("none.txt"));
        assert!(!ledger.seen(ALBUM).await.unwrap());
        assert!(ledger.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_then_seen() {
        let dir = TempDir::new().unwrap();
        let ledger = DedupLedger::new(dir.path().join(DEFAULT_LEDGER_FILE));
        assert!(ledger.record(ALBUM).await.unwrap());
        assert!(ledger.seen(ALBUM).await.unwrap());
        assert!(!ledger.seen("https://www.v2ph.com/album/other").await.unwrap());
    }

    #[tokio::test]
    async fn test_record_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let ledger = DedupLedger::new(dir.path().join(DEFAULT_LEDGER_FILE));
        assert!(ledger.record(ALBUM).await.unwrap());
        assert!(!ledger.record(ALBUM).await.unwrap());
        let contents = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(contents, format!("{ALBUM}\n"));
    }

    #[tokio::test]
    async fn test_record_appends_in_order() {
        let dir = TempDir::new().unwrap();
        let ledger = DedupLedger::new(dir.path().join(DEFAULT_LEDGER_FILE));
        ledger.record("a").await.unwrap();
        ledger.record("b").await.unwrap();
        assert_eq!(ledger.entries().await.unwrap(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_record_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("ledger.txt");
        let ledger = DedupLedger::new(&path);
        ledger.record(ALBUM).await.unwrap();
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_record_repairs_missing_trailing_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_LEDGER_FILE);
        std::fs::write(&path, "first").unwrap();
        let ledger = DedupLedger::new(&path);
        ledger.record("second").await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }

    #[tokio::test]
    async fn test_external_edit_is_visible() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_LEDGER_FILE);
        let ledger = DedupLedger::new(&path);
        ledger.record(ALBUM).await.unwrap();
        std::fs::write(&path, "").unwrap();
        assert!(!ledger.seen(ALBUM).await.unwrap());
    }

    #[tokio::test]
    async fn test_unreadable_ledger_is_error() {
        let dir = TempDir::new().unwrap();
        // A directory in place of the file cannot be read as text.
        let ledger = DedupLedger::new(dir.path());
        let err = ledger.seen(ALBUM).await.unwrap_err();
        assert!(matches!(err, LedgerError::Io { .. }));
    }
}
