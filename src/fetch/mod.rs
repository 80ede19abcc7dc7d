//! Page fetching: the render capability, block detection and retry.
//!
//! [`BlockAwareFetcher`] drives an injected [`RenderSession`] through the
//! retry state machine:
//!
//! - hard block: fail after one attempt
//! - challenge: ask the session to resolve it once, re-render, else back off
//! - timeout / transport error: back off and retry
//!
//! ```no_run
//! use std::sync::Arc;
//! use v2dl_core::fetch::{BlockAwareFetcher, HttpRenderSession, RetryPolicy};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(HttpRenderSession::new()?);
//! let fetcher = BlockAwareFetcher::new(session, RetryPolicy::default());
//! let html = fetcher.fetch("https://www.v2ph.com/album/a?page=1").await?;
//! println!("{} bytes", html.len());
//! # Ok(())
//! # }
//! ```

mod block;
mod fetcher;
mod http;
mod retry;
mod session;

pub use block::{BlockKind, RenderResult, detect_block, looks_blocked};
pub use fetcher::{AttemptFailure, BlockAwareFetcher, FetchError};
pub use http::HttpRenderSession;
pub use retry::{
    DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_JITTER, FailureType, RetryDecision,
    RetryPolicy, classify_render,
};
pub use session::{RenderError, RenderSession, RenderedPage};
