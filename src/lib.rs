//! v2dl Core Library
//!
//! Walks paginated album sites, extracts album and media links, and downloads
//! media under a bandwidth cap, skipping albums already recorded in a ledger.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Target URL classification and link extraction
//! - [`fetch`] - Page rendering with block detection, retry and backoff
//! - [`walker`] - Pagination across the pages of one target
//! - [`ledger`] - Append-only record of processed albums
//! - [`download`] - Download queue, worker and rate-limited transfer
//! - [`config`] - Config file and resolved settings
//! - [`orchestrator`] - Composes the above for one invocation

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod fetch;
pub mod ledger;
pub mod orchestrator;
pub mod parser;
pub mod walker;

pub(crate) mod user_agent;

#[cfg(test)]
pub mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, Settings};
pub use download::{
    ByteRateLimit, DownloadQueue, DownloadTask, ItemOutcome, RateLimitedTransfer, TaskHandler,
    TransferError,
};
pub use fetch::{
    BlockAwareFetcher, FetchError, HttpRenderSession, RenderError, RenderSession, RenderedPage,
    RetryPolicy,
};
pub use ledger::{DedupLedger, LedgerError, LedgerPolicy};
pub use orchestrator::{Orchestrator, RunSummary};
pub use parser::{LinkExtractor, LinkRecord, MediaRef, Target, TargetError, TargetKind, parse_targets};
pub use walker::{AlbumJob, PageDelay, PaginationWalker, WalkOutcome};
