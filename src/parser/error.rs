//! Error types for target URL parsing.

use thiserror::Error;

/// Maximum URL length to accept (standard browser limit).
pub const MAX_URL_LENGTH: usize = 2000;

/// Errors that can occur while turning an input URL into a [`Target`](super::Target).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetError {
    /// URL is malformed or uses an unsupported scheme
    #[error("invalid URL '{url}': {reason}\n  Suggestion: {suggestion}")]
    InvalidUrl {
        /// The URL that failed validation
        url: String,
        /// Why the URL is invalid
        reason: String,
        /// How to fix the issue
        suggestion: String,
    },

    /// First path segment does not name a known page kind
    #[error(
        "unsupported URL type '{url}'\n  Suggestion: use an /album/, /actor/, /company/, /category/ or /country/ URL"
    )]
    UnsupportedKind {
        /// The rejected URL
        url: String,
    },

    /// The `page` query parameter is not a positive integer
    #[error("invalid page number '{value}' in '{url}': pages start at 1")]
    InvalidPage {
        /// The URL carrying the bad parameter
        url: String,
        /// Raw parameter value
        value: String,
    },

    /// URL exceeds maximum allowed length
    #[error("URL too long ({length} chars, max {max}): {url_preview}...")]
    UrlTooLong {
        /// Truncated URL for display
        url_preview: String,
        /// Actual length
        length: usize,
        /// Maximum allowed
        max: usize,
    },
}

impl TargetError {
    /// Creates an `InvalidUrl` error for a malformed URL.
    #[must_use]
    pub fn malformed(url: &str, parse_error: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: parse_error.to_string(),
            suggestion: "Check the URL format and try again".to_string(),
        }
    }

    /// Creates an `InvalidUrl` error for a non-web URL scheme.
    #[must_use]
    pub fn unsupported_scheme(url: &str, scheme: &str) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            reason: format!("scheme '{scheme}' is not supported"),
            suggestion: "Use http:// or https:// URLs".to_string(),
        }
    }

    /// Creates an `UnsupportedKind` error.
    #[must_use]
    pub fn unsupported_kind(url: &str) -> Self {
        Self::UnsupportedKind {
            url: url.to_string(),
        }
    }

    /// Creates an `InvalidPage` error.
    #[must_use]
    pub fn invalid_page(url: &str, value: &str) -> Self {
        Self::InvalidPage {
            url: url.to_string(),
            value: value.to_string(),
        }
    }

    /// Creates a `UrlTooLong` error for URLs exceeding the maximum length.
    #[must_use]
    pub fn too_long(url: &str) -> Self {
        Self::UrlTooLong {
            url_preview: url.chars().take(50).collect(),
            length: url.len(),
            max: MAX_URL_LENGTH,
        }
    }
}
