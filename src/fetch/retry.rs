//! Retry policy for page fetches.
//!
//! Each failed render attempt is classified into a [`FailureType`]; the
//! [`RetryPolicy`] then decides whether another attempt is worth making and
//! how long to back off first.
//!
//! # Delay Calculation
//!
//! ```text
//! delay = base_delay + uniform(0, max_jitter)
//! ```
//!
//! The delay is flat rather than exponential: the site's challenge pages clear
//! on a wall-clock timer, so waiting longer on later attempts buys nothing.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, instrument};

use super::block::{BlockKind, RenderResult};

/// Default number of render attempts per page.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default flat backoff between attempts (5 seconds).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(5);

/// Default upper bound of the random jitter added to each backoff (5 seconds).
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_secs(5);

/// Classification of a failed render attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Timeout, transport error or unexpected status; may succeed later.
    Transient,

    /// A challenge interstitial that was not cleared.
    Challenge,

    /// Terminal denial page.
    HardBlock,

    /// Content requires a logged-in session.
    LoginRequired,
}

/// Decision on whether to make another attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry {
        /// How long to wait before retrying.
        delay: Duration,
        /// Which attempt number this will be (1-indexed, so first retry is attempt 2).
        attempt: u32,
    },

    /// Give up on this URL.
    DoNotRetry {
        /// Human-readable reason why retry is not attempted.
        reason: String,
    },
}

/// Retry configuration for [`BlockAwareFetcher`](super::BlockAwareFetcher).
///
/// # Default Values
///
/// - `max_attempts`: 3
/// - `base_delay`: 5 seconds
/// - `max_jitter`: 5 seconds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial attempt).
    max_attempts: u32,

    /// Fixed part of every backoff.
    base_delay: Duration,

    /// Upper bound of the uniform random part of every backoff.
    max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
        }
    }
}

impl RetryPolicy {
    /// Creates a retry policy with custom settings.
    ///
    /// `max_attempts` is clamped to at least 1.
    #[must_use]
    pub fn new(max_attempts: u32, base_delay: Duration, max_jitter: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_jitter,
        }
    }

    /// Creates a policy with a custom `max_attempts`, using defaults for other settings.
    #[must_use]
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    /// Returns the maximum number of attempts configured.
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Returns the fixed backoff component.
    #[must_use]
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Returns the jitter upper bound.
    #[must_use]
    pub fn max_jitter(&self) -> Duration {
        self.max_jitter
    }

    /// Determines whether to retry after `attempt` (1-indexed) failed.
    #[instrument(skip(self), fields(max_attempts = self.max_attempts))]
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        match failure_type {
            FailureType::HardBlock => {
                return RetryDecision::DoNotRetry {
                    reason: "hard block - retry would not help".to_string(),
                };
            }
            FailureType::LoginRequired => {
                return RetryDecision::DoNotRetry {
                    reason: "login required - retry without a session would not help"
                        .to_string(),
                };
            }
            FailureType::Transient | FailureType::Challenge => {}
        }

        if attempt >= self.max_attempts {
            debug!(attempt, max = self.max_attempts, "max attempts reached");
            return RetryDecision::DoNotRetry {
                reason: format!("max attempts ({}) exhausted", self.max_attempts),
            };
        }

        let delay = self.calculate_delay();
        debug!(
            attempt,
            next_attempt = attempt + 1,
            delay_ms = delay.as_millis(),
            "will retry"
        );

        RetryDecision::Retry {
            delay,
            attempt: attempt + 1,
        }
    }

    fn calculate_delay(&self) -> Duration {
        self.base_delay + self.calculate_jitter()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn calculate_jitter(&self) -> Duration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return Duration::ZERO;
        }
        let mut rng = rand::thread_rng();
        Duration::from_millis(rng.gen_range(0..=max_ms))
    }
}

/// Classifies a render attempt; `None` means the attempt produced content.
#[must_use]
pub fn classify_render(result: &RenderResult) -> Option<FailureType> {
    match result {
        RenderResult::Content(_) => None,
        RenderResult::Blocked(BlockKind::Challenge) => Some(FailureType::Challenge),
        RenderResult::Blocked(BlockKind::Hard) => Some(FailureType::HardBlock),
        RenderResult::Blocked(BlockKind::LoginRequired) => Some(FailureType::LoginRequired),
        RenderResult::Failed(_) => Some(FailureType::Transient),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::fetch::RenderError;

    // ==================== RetryPolicy Tests ====================

    #[test]
    fn test_retry_policy_default_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.base_delay(), Duration::from_secs(5));
        assert_eq!(policy.max_jitter(), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_policy_max_attempts_minimum_is_one() {
        let policy = RetryPolicy::with_max_attempts(0);
        assert_eq!(policy.max_attempts(), 1);
    }

    #[test]
    fn test_retry_policy_custom() {
        let policy = RetryPolicy::new(5, Duration::from_millis(500), Duration::from_secs(2));
        assert_eq!(policy.max_attempts(), 5);
        assert_eq!(policy.base_delay(), Duration::from_millis(500));
        assert_eq!(policy.max_jitter(), Duration::from_secs(2));
    }

    // ==================== Delay Tests ====================

    #[test]
    fn test_delay_within_base_plus_jitter() {
        let policy = RetryPolicy::default();
        for _ in 0..100 {
            let delay = policy.calculate_delay();
            assert!(delay >= Duration::from_secs(5));
            assert!(delay <= Duration::from_secs(10), "delay {delay:?} too long");
        }
    }

    #[test]
    fn test_zero_jitter_is_exact() {
        let policy = RetryPolicy::new(3, Duration::from_secs(1), Duration::ZERO);
        assert_eq!(policy.calculate_delay(), Duration::from_secs(1));
    }

    // ==================== Should Retry Decision Tests ====================

    #[test]
    fn test_hard_block_never_retries() {
        let decision = RetryPolicy::default().should_retry(FailureType::HardBlock, 1);
        match decision {
            RetryDecision::DoNotRetry { reason } => assert!(reason.contains("hard block")),
            other => panic!("Expected DoNotRetry, got {other:?}"),
        }
    }

    #[test]
    fn test_login_required_never_retries() {
        let decision = RetryPolicy::default().should_retry(FailureType::LoginRequired, 1);
        assert!(matches!(decision, RetryDecision::DoNotRetry { .. }));
    }

    #[test]
    fn test_challenge_and_transient_retry() {
        let policy = RetryPolicy::default();
        for failure in [FailureType::Challenge, FailureType::Transient] {
            match policy.should_retry(failure, 1) {
                RetryDecision::Retry { attempt, .. } => assert_eq!(attempt, 2),
                other => panic!("Expected Retry, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_should_retry_respects_max_attempts() {
        let policy = RetryPolicy::with_max_attempts(3);
        assert!(matches!(
            policy.should_retry(FailureType::Transient, 2),
            RetryDecision::Retry { .. }
        ));
        match policy.should_retry(FailureType::Transient, 3) {
            RetryDecision::DoNotRetry { reason } => assert!(reason.contains("exhausted")),
            other => panic!("Expected DoNotRetry, got {other:?}"),
        }
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_classify_render() {
        assert_eq!(classify_render(&RenderResult::Content(String::new())), None);
        assert_eq!(
            classify_render(&RenderResult::Blocked(BlockKind::Challenge)),
            Some(FailureType::Challenge)
        );
        assert_eq!(
            classify_render(&RenderResult::Blocked(BlockKind::Hard)),
            Some(FailureType::HardBlock)
        );
        assert_eq!(
            classify_render(&RenderResult::Blocked(BlockKind::LoginRequired)),
            Some(FailureType::LoginRequired)
        );
        assert_eq!(
            classify_render(&RenderResult::Failed(RenderError::timeout("u"))),
            Some(FailureType::Transient)
        );
    }
}
