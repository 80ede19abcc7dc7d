//! Retrying, block-aware page fetcher.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use super::block::{BlockKind, RenderResult};
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_render};
use super::session::{RenderError, RenderSession};

/// Why a single attempt did not yield content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    /// A challenge page was served and not cleared.
    #[error("challenge page not cleared")]
    Challenge,

    /// The session could not load the page.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Errors returned by [`BlockAwareFetcher::fetch`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The site served its terminal denial page.
    #[error("hard block fetching {url}")]
    HardBlock {
        /// The URL that was blocked.
        url: String,
    },

    /// The site served its login form instead of content.
    #[error("login required fetching {url}\n  Suggestion: this page is only visible to signed-in accounts")]
    LoginRequired {
        /// The URL behind the login wall.
        url: String,
    },

    /// Every attempt failed with a retryable condition.
    #[error("gave up on {url} after {attempts} attempts: {last}")]
    Exhausted {
        /// The URL that could not be fetched.
        url: String,
        /// Number of attempts made.
        attempts: u32,
        /// Failure of the final attempt.
        #[source]
        last: AttemptFailure,
    },
}

impl FetchError {
    /// Creates a hard block error.
    pub fn hard_block(url: impl Into<String>) -> Self {
        Self::HardBlock { url: url.into() }
    }

    /// Creates a login-required error.
    pub fn login_required(url: impl Into<String>) -> Self {
        Self::LoginRequired { url: url.into() }
    }

    /// Creates an exhausted-retries error.
    pub fn exhausted(url: impl Into<String>, attempts: u32, last: AttemptFailure) -> Self {
        Self::Exhausted {
            url: url.into(),
            attempts,
            last,
        }
    }
}

/// Wraps a [`RenderSession`] with retry, backoff and challenge handling.
///
/// Holds no per-URL state; every [`fetch`](Self::fetch) starts fresh.
#[derive(Clone)]
pub struct BlockAwareFetcher {
    session: Arc<dyn RenderSession>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for BlockAwareFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlockAwareFetcher")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl BlockAwareFetcher {
    /// Creates a fetcher over `session`.
    #[must_use]
    pub fn new(session: Arc<dyn RenderSession>, policy: RetryPolicy) -> Self {
        Self { session, policy }
    }

    /// Fetches `url`, returning the page markup.
    ///
    /// # Errors
    ///
    /// - [`FetchError::HardBlock`] after exactly one attempt when the denial page is served.
    /// - [`FetchError::LoginRequired`] when the login form is served.
    /// - [`FetchError::Exhausted`] when every attempt hit a challenge or render failure.
    #[instrument(skip(self), fields(max_attempts = self.policy.max_attempts()))]
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let mut attempt = 1;
        loop {
            let result = match self.attempt(url).await {
                RenderResult::Content(content) => {
                    debug!(url, attempt, bytes = content.len(), "page fetched");
                    return Ok(content);
                }
                other => other,
            };
            let failure_type = classify_render(&result).unwrap_or(FailureType::Transient);

            match self.policy.should_retry(failure_type, attempt) {
                RetryDecision::Retry { delay, attempt: next } => {
                    warn!(
                        url,
                        attempt,
                        reason = ?failure_type,
                        delay_ms = delay.as_millis(),
                        "fetch attempt failed; backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt = next;
                }
                RetryDecision::DoNotRetry { reason } => {
                    warn!(url, attempt, %reason, "giving up on page");
                    return Err(match failure_type {
                        FailureType::HardBlock => FetchError::hard_block(url),
                        FailureType::LoginRequired => FetchError::login_required(url),
                        FailureType::Challenge | FailureType::Transient => {
                            FetchError::exhausted(url, attempt, into_attempt_failure(result))
                        }
                    });
                }
            }
        }
    }

    /// One attempt slot: a render plus at most one challenge-resolution round.
    async fn attempt(&self, url: &str) -> RenderResult {
        let first = RenderResult::classify(self.session.render(url).await);
        if first != RenderResult::Blocked(BlockKind::Challenge) {
            return first;
        }

        if self.session.resolve_challenge(url).await {
            info!(url, "challenge resolved; re-rendering");
            RenderResult::classify(self.session.render(url).await)
        } else {
            debug!(url, "challenge not resolved");
            first
        }
    }
}

fn into_attempt_failure(result: RenderResult) -> AttemptFailure {
    match result {
        RenderResult::Failed(e) => AttemptFailure::Render(e),
        RenderResult::Content(_) | RenderResult::Blocked(_) => AttemptFailure::Challenge,
    }
}
