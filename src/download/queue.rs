//! Producer/consumer queue between the orchestrator and the download worker.
//!
//! # Protocol
//!
//! - [`DownloadQueue::spawn`] starts exactly one worker task.
//! - [`DownloadQueue::enqueue`] sends a task; it waits when the queue is full.
//! - [`DownloadQueue::shutdown`] sends the `Shutdown` sentinel and awaits the
//!   worker. Everything enqueued before the sentinel is processed first.
//!
//! Tasks are handled strictly FIFO and one at a time. A task that fails is
//! logged and the worker moves on.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::error::QueueError;
use super::task::{DownloadTask, TaskHandler, WorkerReport};
use crate::ledger::DedupLedger;

/// Message on the queue channel.
#[derive(Debug)]
pub enum QueueMessage {
    /// Work item.
    Task(DownloadTask),
    /// No more tasks follow; the worker exits after draining.
    Shutdown,
}

/// Handle owned by the orchestrator.
#[derive(Debug)]
pub struct DownloadQueue {
    sender: mpsc::Sender<QueueMessage>,
    worker: JoinHandle<WorkerReport>,
}

impl DownloadQueue {
    /// Spawns the worker with a queue of `capacity` slots (at least 1).
    ///
    /// When `completion_ledger` is given, tasks flagged
    /// `record_on_completion` are recorded there once all their items are on disk.
    #[must_use]
    pub fn spawn<H: TaskHandler>(
        handler: H,
        capacity: usize,
        completion_ledger: Option<DedupLedger>,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_worker(Arc::new(handler), receiver, completion_ledger));
        debug!(capacity, "download worker spawned");
        Self { sender, worker }
    }

    /// Enqueues a task.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::WorkerGone`] if the worker has already exited.
    pub async fn enqueue(&self, task: DownloadTask) -> Result<(), QueueError> {
        debug!(album = %task.album_id, items = task.items.len(), "enqueueing task");
        self.sender
            .send(QueueMessage::Task(task))
            .await
            .map_err(|_| QueueError::WorkerGone)
    }

    /// Sends the shutdown sentinel and waits for the worker to drain.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::WorkerFailed`] if the worker panicked.
    pub async fn shutdown(self) -> Result<WorkerReport, QueueError> {
        if self.sender.send(QueueMessage::Shutdown).await.is_err() {
            warn!("worker exited before shutdown sentinel");
        }
        drop(self.sender);
        self.worker.await.map_err(|e| QueueError::WorkerFailed {
            reason: e.to_string(),
        })
    }
}

async fn run_worker<H: TaskHandler>(
    handler: Arc<H>,
    mut receiver: mpsc::Receiver<QueueMessage>,
    completion_ledger: Option<DedupLedger>,
) -> WorkerReport {
    let mut report = WorkerReport::default();

    while let Some(message) = receiver.recv().await {
        let task = match message {
            QueueMessage::Task(task) => task,
            QueueMessage::Shutdown => {
                debug!("shutdown sentinel received");
                break;
            }
        };
        report.tasks += 1;

        match handler.handle(&task).await {
            Ok(task_report) => {
                report.absorb(&task_report);
                if task.record_on_completion
                    && task_report.is_complete()
                    && let Some(ledger) = &completion_ledger
                {
                    match ledger.record(&task.album_id).await {
                        Ok(true) => report.recorded += 1,
                        Ok(false) => {}
                        Err(e) => warn!(album = %task.album_id, error = %e, "failed to record album"),
                    }
                }
            }
            Err(e) => {
                report.failed_tasks += 1;
                error!(album = %task.album_id, error = %e, "download task failed");
            }
        }
    }

    info!(
        tasks = report.tasks,
        downloaded = report.downloaded,
        skipped = report.skipped,
        failed = report.failed,
        "download worker finished"
    );
    report
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::download::{TaskReport, TransferError};
    use crate::parser::MediaRef;

    /// Records the order tasks are seen in; fails albums whose id starts with "bad".
    #[derive(Clone, Default)]
    struct RecordingHandler {
        seen: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl TaskHandler for RecordingHandler {
        async fn handle(&self, task: &DownloadTask) -> Result<TaskReport, TransferError> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.seen.lock().unwrap().push(task.album_id.clone());
            if task.album_id.starts_with("bad") {
                return Err(TransferError::invalid_url(&task.album_id));
            }
            Ok(TaskReport {
                downloaded: task.items.len(),
                ..TaskReport::default()
            })
        }
    }

    fn task(id: &str, items: usize) -> DownloadTask {
        DownloadTask {
            album_id: id.to_string(),
            folder: id.to_string(),
            items: (0..items)
                .map(|i| MediaRef::new(format!("https://cdn/{i}.jpg"), i.to_string()))
                .collect(),
            record_on_completion: true,
        }
    }

    #[tokio::test]
    async fn test_drains_in_fifo_order_before_exit() {
        let handler = RecordingHandler::default();
        let queue = DownloadQueue::spawn(handler.clone(), 2, None);
        for i in 0..10 {
            queue.enqueue(task(&format!("album-{i}"), 1)).await.unwrap();
        }
        let report = queue.shutdown().await.unwrap();

        let expected: Vec<String> = (0..10).map(|i| format!("album-{i}")).collect();
        assert_eq!(*handler.seen.lock().unwrap(), expected);
        assert_eq!(report.tasks, 10);
        assert_eq!(report.downloaded, 10);
    }

    #[tokio::test]
    async fn test_failed_task_does_not_stop_worker() {
        let handler = RecordingHandler::default();
        let queue = DownloadQueue::spawn(handler.clone(), 4, None);
        queue.enqueue(task("bad-1", 1)).await.unwrap();
        queue.enqueue(task("good-1", 2)).await.unwrap();
        let report = queue.shutdown().await.unwrap();

        assert_eq!(report.tasks, 2);
        assert_eq!(report.failed_tasks, 1);
        assert_eq!(report.downloaded, 2);
    }

    #[tokio::test]
    async fn test_completion_ledger_records_complete_tasks_only() {
        let dir = TempDir::new().unwrap();
        let ledger = DedupLedger::new(dir.path().join("ledger.txt"));
        let queue = DownloadQueue::spawn(RecordingHandler::default(), 4, Some(ledger.clone()));
        queue.enqueue(task("good-1", 1)).await.unwrap();
        queue.enqueue(task("bad-1", 1)).await.unwrap();
        let mut unflagged = task("good-2", 1);
        unflagged.record_on_completion = false;
        queue.enqueue(unflagged).await.unwrap();
        let report = queue.shutdown().await.unwrap();

        assert_eq!(report.recorded, 1);
        assert_eq!(ledger.entries().await.unwrap(), vec!["good-1"]);
    }

    #[tokio::test]
    async fn test_shutdown_with_no_tasks() {
        let queue = DownloadQueue::spawn(RecordingHandler::default(), 1, None);
        let report = queue.shutdown().await.unwrap();
        assert_eq!(report, WorkerReport::default());
    }
}
