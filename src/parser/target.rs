//! Target URL classification and page-parameter handling.

use std::fmt;

use tracing::debug;
use url::Url;

use super::error::{MAX_URL_LENGTH, TargetError};

/// Query parameter carrying the page number on every paginated page.
pub const PAGE_PARAM: &str = "page";

/// Path segments that introduce a listing of albums.
const LISTING_SEGMENTS: [&str; 4] = ["actor", "company", "category", "country"];

/// Path segment that introduces a single album.
const ALBUM_SEGMENT: &str = "album";

/// Kind of page a target points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// A page enumerating media items of one album.
    Album,
    /// A page enumerating albums (by actor, company, category or country).
    Listing,
}

impl TargetKind {
    /// Human label used in log lines.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Listing => "listing",
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, validated entry point for a walk.
///
/// The page encoded in the URL's `page` parameter becomes the walk's start
/// page; it is always at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    url: Url,
    kind: TargetKind,
    start_page: u32,
}

impl Target {
    /// Parses and classifies a target URL.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] when the URL is malformed, not http(s), its first
    /// path segment names no known page kind, or its `page` parameter is not a
    /// positive integer.
    pub fn parse(input: &str) -> Result<Self, TargetError> {
        let raw = input.trim();
        if raw.len() > MAX_URL_LENGTH {
            return Err(TargetError::too_long(raw));
        }

        let url = Url::parse(raw).map_err(|e| TargetError::malformed(raw, &e.to_string()))?;
        match url.scheme() {
            "http" | "https" => {}
            scheme => return Err(TargetError::unsupported_scheme(raw, scheme)),
        }

        let kind = classify_path(&url).ok_or_else(|| TargetError::unsupported_kind(raw))?;
        let start_page = match page_param(&url) {
            None => 1,
            Some(value) => match value.parse::<u32>() {
                Ok(page) if page >= 1 => page,
                _ => return Err(TargetError::invalid_page(raw, &value)),
            },
        };

        debug!(url = %url, %kind, start_page, "parsed target");
        Ok(Self {
            url,
            kind,
            start_page,
        })
    }

    /// The URL as given (normalized by the `url` crate).
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Album or listing.
    #[must_use]
    pub fn kind(&self) -> TargetKind {
        self.kind
    }

    /// First page of the walk.
    #[must_use]
    pub fn start_page(&self) -> u32 {
        self.start_page
    }

    /// URL of the given page of this target, replacing any existing page parameter.
    #[must_use]
    pub fn page_url(&self, page: u32) -> String {
        let mut url = strip_page_param(&self.url);
        url.query_pairs_mut()
            .append_pair(PAGE_PARAM, &page.to_string());
        url.into()
    }

    /// Canonical identifier used by the dedup ledger: the URL without its page parameter.
    #[must_use]
    pub fn album_id(&self) -> String {
        strip_page_param(&self.url).into()
    }

    /// Last non-empty path segment, used when an album has no usable caption.
    #[must_use]
    pub fn slug(&self) -> Option<&str> {
        self.url
            .path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url.as_str())
    }
}

fn classify_path(url: &Url) -> Option<TargetKind> {
    let first = url.path_segments()?.find(|s| !s.is_empty())?;
    if first == ALBUM_SEGMENT {
        Some(TargetKind::Album)
    } else if LISTING_SEGMENTS.contains(&first) {
        Some(TargetKind::Listing)
    } else {
        None
    }
}

fn page_param(url: &Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == PAGE_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Removes every `page` query parameter, dropping the `?` when nothing else remains.
#[must_use]
pub fn strip_page_param(url: &Url) -> Url {
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut stripped = url.clone();
    if kept.is_empty() {
        stripped.set_query(None);
    } else {
        stripped.query_pairs_mut().clear().extend_pairs(kept);
    }
    stripped
}
