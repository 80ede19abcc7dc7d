//! The page-rendering capability consumed by the fetch layer.
//!
//! A [`RenderSession`] loads one URL and hands back the materialized markup
//! together with whatever block signals the session itself could observe.
//! The crate ships [`HttpRenderSession`](super::HttpRenderSession); a real
//! browser-backed session can be injected behind the same trait.

use async_trait::async_trait;
use thiserror::Error;

/// Markup produced by one render, plus the session's own block verdicts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedPage {
    /// Raw page markup.
    pub content: String,
    /// Session saw a solvable interstitial.
    pub blocked_simple: bool,
    /// Session saw a terminal denial page.
    pub blocked_hard: bool,
}

impl RenderedPage {
    /// A page carrying content and no block flags.
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Reasons a single render could not produce content.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The page did not load within the session's time budget.
    #[error("timeout rendering {url}")]
    Timeout {
        /// The URL being rendered.
        url: String,
    },

    /// Connection, DNS or protocol failure.
    #[error("transport error rendering {url}: {reason}")]
    Transport {
        /// The URL being rendered.
        url: String,
        /// Underlying error text.
        reason: String,
    },

    /// Server answered with a non-success status and no recognizable block page.
    #[error("HTTP {status} rendering {url}")]
    Status {
        /// The URL being rendered.
        url: String,
        /// The HTTP status code.
        status: u16,
    },
}

impl RenderError {
    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates a transport error.
    pub fn transport(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Creates a status error.
    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Status {
            url: url.into(),
            status,
        }
    }
}

/// Loads a URL in a browser-like environment.
///
/// Implementations are shared as `Arc<dyn RenderSession>` and are only ever
/// driven by one task at a time.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Renders `url` and returns its markup.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] when the page could not be loaded at all. Block
    /// pages are not errors; they come back as content for classification.
    async fn render(&self, url: &str) -> Result<RenderedPage, RenderError>;

    /// Attempts to clear a challenge interstitial for `url`.
    ///
    /// Returns `true` when the challenge is believed solved and a re-render
    /// should see real content. Sessions that cannot interact return `false`.
    async fn resolve_challenge(&self, _url: &str) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopSession;

    #[async_trait]
    impl RenderSession for NoopSession {
        async fn render(&self, _url: &str) -> Result<RenderedPage, RenderError> {
            Ok(RenderedPage::content("<html></html>"))
        }
    }

    #[tokio::test]
    async fn test_resolve_challenge_defaults_to_unable() {
        assert!(!NoopSession.resolve_challenge("https://www.v2ph.com/album/a").await);
    }

    #[test]
    fn test_rendered_page_content_has_no_flags() {
        let page = RenderedPage::content("x");
        assert_eq!(page.content, "x");
        assert!(!page.blocked_simple);
        assert!(!page.blocked_hard);
    }

    #[test]
    fn test_render_error_display_includes_url() {
        let err = RenderError::status("https://www.v2ph.com/album/a?page=1", 502);
        let msg = err.to_string();
        assert!(msg.contains("502"));
        assert!(msg.contains("album/a"));
    }
}
