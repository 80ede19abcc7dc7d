//! Block-page classification.
//!
//! Cloudflare-style interstitials are recognized from the page title, the
//! login wall and the "Checking your browser" banner from the body.

use std::sync::LazyLock;

use regex::Regex;

use super::session::{RenderError, RenderedPage};

/// Titles shown by solvable challenge interstitials.
pub const CHALLENGE_TITLES: [&str; 2] = ["請稍候...", "Just a moment..."];

/// Body text shown while a challenge is being checked.
pub const CHALLENGE_BODY_MARKER: &str = "Checking your";

/// Title of the terminal denial page.
pub const HARD_BLOCK_TITLE: &str = "Attention Required! | Cloudflare";

/// Body text of the site's login form.
pub const LOGIN_WALL_MARKER: &str = "用戶登錄";

#[allow(clippy::expect_used)]
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title regex is valid")
});

/// What kind of block a page represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    /// Interstitial that may clear after automated interaction or a wait.
    Challenge,
    /// Terminal denial; retrying will not help.
    Hard,
    /// Content hidden behind the login form.
    LoginRequired,
}

/// Outcome of one render attempt after block classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderResult {
    /// Usable markup.
    Content(String),
    /// A block page was served instead of content.
    Blocked(BlockKind),
    /// The session could not load the page.
    Failed(RenderError),
}

impl RenderResult {
    /// Classifies a session result.
    #[must_use]
    pub fn classify(result: Result<RenderedPage, RenderError>) -> Self {
        match result {
            Ok(page) => match detect_block(&page) {
                Some(kind) => Self::Blocked(kind),
                None => Self::Content(page.content),
            },
            Err(e) => Self::Failed(e),
        }
    }
}

/// Inspects a rendered page for block indicators.
///
/// Hard blocks win over login walls, which win over challenges.
#[must_use]
pub fn detect_block(page: &RenderedPage) -> Option<BlockKind> {
    let title = page_title(&page.content).unwrap_or_default();

    if page.blocked_hard || title.contains(HARD_BLOCK_TITLE) {
        return Some(BlockKind::Hard);
    }
    if page.content.contains(LOGIN_WALL_MARKER) {
        return Some(BlockKind::LoginRequired);
    }
    if page.blocked_simple
        || CHALLENGE_TITLES.iter().any(|t| title.contains(t))
        || page.content.contains(CHALLENGE_BODY_MARKER)
    {
        return Some(BlockKind::Challenge);
    }
    None
}

/// Returns true when raw markup looks like any known block page.
#[must_use]
pub fn looks_blocked(content: &str) -> bool {
    let page = RenderedPage::content(content);
    detect_block(&page).is_some()
}

fn page_title(content: &str) -> Option<String> {
    TITLE_RE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}
