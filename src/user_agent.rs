//! Shared User-Agent strings for page and media HTTP clients.
//!
//! The target site serves challenge pages to clients that do not look like a
//! desktop browser, so both clients present the same Chrome identity.

/// Desktop Chrome User-Agent presented on every request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36";

/// Referer sent with the first page request of a session.
pub const SEARCH_REFERER: &str = "https://www.google.com/";

/// User-Agent for page and media requests.
#[must_use]
pub(crate) fn browser_user_agent() -> &'static str {
    BROWSER_USER_AGENT
}
