//! Units of work passed from the orchestrator to the download worker.

use std::path::PathBuf;

use async_trait::async_trait;

use super::error::TransferError;
use crate::parser::MediaRef;

/// All media of one album, to be stored under one folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTask {
    /// Album URL without its page parameter.
    pub album_id: String,
    /// Folder name under the download root.
    pub folder: String,
    /// Media in page-discovery order.
    pub items: Vec<MediaRef>,
    /// Record `album_id` in the ledger once every item is on disk.
    pub record_on_completion: bool,
}

/// Result of transferring one media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    /// File already existed; nothing was fetched.
    Skipped {
        /// Existing file.
        path: PathBuf,
    },
    /// File fetched and written.
    Downloaded {
        /// Written file.
        path: PathBuf,
        /// Bytes written.
        bytes: u64,
    },
    /// Transfer failed; the item is left for a later run.
    Failed {
        /// Media URL.
        url: String,
        /// Error text.
        reason: String,
    },
}

/// Per-task counters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Items fetched.
    pub downloaded: usize,
    /// Items already on disk.
    pub skipped: usize,
    /// Items that failed.
    pub failed: usize,
    /// Bytes written.
    pub bytes: u64,
}

impl TaskReport {
    /// Adds one item outcome.
    pub fn record(&mut self, outcome: &ItemOutcome) {
        match outcome {
            ItemOutcome::Skipped { .. } => self.skipped += 1,
            ItemOutcome::Downloaded { bytes, .. } => {
                self.downloaded += 1;
                self.bytes += bytes;
            }
            ItemOutcome::Failed { .. } => self.failed += 1,
        }
    }

    /// True when every item is on disk.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

/// Aggregated counters for everything the worker processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Tasks taken off the queue.
    pub tasks: usize,
    /// Tasks that could not be processed at all.
    pub failed_tasks: usize,
    /// Items fetched.
    pub downloaded: usize,
    /// Items already on disk.
    pub skipped: usize,
    /// Items that failed.
    pub failed: usize,
    /// Bytes written.
    pub bytes: u64,
    /// Albums recorded in the ledger by the worker.
    pub recorded: usize,
}

impl WorkerReport {
    /// Folds one task's counters in.
    pub fn absorb(&mut self, report: &TaskReport) {
        self.downloaded += report.downloaded;
        self.skipped += report.skipped;
        self.failed += report.failed;
        self.bytes += report.bytes;
    }
}

/// Processes one task. The worker calls this strictly one task at a time.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    /// Handles `task`, returning per-item counters.
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] when the task cannot be processed at all
    /// (e.g. its folder cannot be created). Per-item failures are counted in
    /// the report instead.
    async fn handle(&self, task: &DownloadTask) -> Result<TaskReport, TransferError>;
}
