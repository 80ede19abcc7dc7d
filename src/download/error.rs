//! Failures of media transfers and of the download queue.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while transferring one media item.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The media host could not be reached or the body stream broke.
    #[error("transfer of {url} failed: {source}")]
    Network {
        /// Media URL.
        url: String,
        /// Client error.
        #[source]
        source: reqwest::Error,
    },

    /// Connect or read timeout.
    #[error("transfer of {url} timed out")]
    Timeout {
        /// Media URL.
        url: String,
    },

    /// The media host answered with a non-success status.
    #[error("media host answered {status} for {url}")]
    HttpStatus {
        /// Media URL.
        url: String,
        /// Status code.
        status: u16,
    },

    /// Creating the album folder, writing the part file or renaming it failed.
    #[error("cannot write {path}: {source}")]
    Io {
        /// File or folder being written.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// The extracted media link does not parse as a URL.
    #[error("invalid media URL: {url}")]
    InvalidUrl {
        /// Link as extracted.
        url: String,
    },
}

impl TransferError {
    /// Wraps a client error; timeouts become [`TransferError::Timeout`].
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        let url = url.into();
        if source.is_timeout() {
            Self::Timeout { url }
        } else {
            Self::Network { url, source }
        }
    }

    /// Non-success status.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Filesystem failure at `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Unparsable media link.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }
}

/// Errors from the download queue protocol.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The worker has exited; no more tasks can be accepted.
    #[error("download worker is no longer running")]
    WorkerGone,

    /// The worker task panicked or was cancelled.
    #[error("download worker failed: {reason}")]
    WorkerFailed {
        /// Join error text.
        reason: String,
    },
}
