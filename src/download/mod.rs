//! Media download pipeline: the queue, its single worker, and the throttled transfer.
//!
//! # Features
//!
//! - One worker, strictly FIFO, drained before exit
//! - Global byte-rate ceiling enforced per 1 KiB chunk
//! - Idempotent re-runs: finished files are skipped, partial files never
//!   take a final name
//!
//! # Example
//!
//! ```no_run
//! use v2dl_core::download::{ByteRateLimit, DownloadQueue, DownloadTask, RateLimitedTransfer};
//! use v2dl_core::parser::MediaRef;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let transfer = RateLimitedTransfer::new("./downloads", ByteRateLimit::from_kib_per_sec(400))?;
//! let queue = DownloadQueue::spawn(transfer, 16, None);
//! queue
//!     .enqueue(DownloadTask {
//!         album_id: "https://www.v2ph.com/album/a".to_string(),
//!         folder: "Album A".to_string(),
//!         items: vec![MediaRef::new("https://cdn.v2ph.com/a/1.jpg", "Album A 1")],
//!         record_on_completion: false,
//!     })
//!     .await?;
//! let report = queue.shutdown().await?;
//! println!("downloaded {}", report.downloaded);
//! # Ok(())
//! # }
//! ```

pub mod constants;
mod error;
pub mod filename;
mod queue;
mod task;
mod throttle;
mod transfer;

pub use error::{QueueError, TransferError};
pub use filename::{album_folder_name, media_filename, sanitize_filename};
pub use queue::{DownloadQueue, QueueMessage};
pub use task::{DownloadTask, ItemOutcome, TaskHandler, TaskReport, WorkerReport};
pub use throttle::{ByteRateLimit, CopyError, throttled_copy};
pub use transfer::RateLimitedTransfer;

// Note: we do NOT define module-local Result aliases.
// Use `Result<T, TransferError>` explicitly in function signatures.
