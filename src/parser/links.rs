//! Link extraction from rendered pages.
//!
//! The rules are specific to the v2ph page layout:
//!
//! | Page kind | Selector | Yields |
//! |-----------|----------|--------|
//! | Listing | `a.media-cover[href]` | album URLs |
//! | Album | `div.album-photo.my-2 > img[data-src]` | media URLs, captions from `alt` |
//! | Any | `li.page-item > a.page-link` | highest page number |

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};
use tracing::{debug, trace};
use url::Url;

use super::target::TargetKind;

#[allow(clippy::expect_used)]
static ALBUM_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.media-cover[href]").expect("album link selector is valid"));

#[allow(clippy::expect_used)]
static ALBUM_PHOTO: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.album-photo.my-2 > img[data-src]").expect("photo selector is valid")
});

#[allow(clippy::expect_used)]
static PAGE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("li.page-item > a.page-link").expect("page link selector is valid")
});

#[allow(clippy::expect_used)]
static PAGE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"page=(\d+)").expect("page number regex is valid"));

/// Pagination controls with longer labels ("Next", "Last") are ignored.
const MAX_PAGE_LABEL_CHARS: usize = 2;

/// One media item of an album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaRef {
    /// Absolute media URL.
    pub url: String,
    /// Caption from the page, or the item's running index when the page has none.
    pub caption: String,
}

impl MediaRef {
    /// Creates a media reference.
    pub fn new(url: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            caption: caption.into(),
        }
    }
}

/// A typed link found on a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkRecord {
    /// Absolute URL of an album, found on a listing page.
    AlbumRef(String),
    /// A media item, found on an album page.
    MediaRef(MediaRef),
}

/// Parses rendered markup into [`LinkRecord`]s. Performs no I/O.
#[derive(Debug, Clone)]
pub struct LinkExtractor {
    base: Url,
}

impl LinkExtractor {
    /// Creates an extractor resolving relative links against `base`.
    #[must_use]
    pub fn new(base: Url) -> Self {
        Self { base }
    }

    /// Extracts records in document order.
    ///
    /// On album pages, images without an `alt` get the caption
    /// `caption_offset + position`, where position is the image's index on the page.
    #[must_use]
    pub fn extract(&self, content: &str, kind: TargetKind, caption_offset: usize) -> Vec<LinkRecord> {
        let document = Html::parse_document(content);
        let records = match kind {
            TargetKind::Listing => self.album_links(&document),
            TargetKind::Album => self.media_links(&document, caption_offset),
        };
        debug!(%kind, count = records.len(), "extracted links");
        records
    }

    /// Highest page number advertised by the pagination controls, or 1.
    #[must_use]
    pub fn max_page(&self, content: &str) -> u32 {
        let document = Html::parse_document(content);
        let max = document
            .select(&PAGE_LINK)
            .filter(|a| {
                let label: String = a.text().collect();
                label.trim().chars().count() <= MAX_PAGE_LABEL_CHARS
            })
            .map(|a| a.value().attr("href").map_or(1, page_number))
            .max()
            .unwrap_or(1);
        trace!(max_page = max, "parsed pagination");
        max
    }

    fn album_links(&self, document: &Html) -> Vec<LinkRecord> {
        document
            .select(&ALBUM_LINK)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| self.resolve(href))
            .map(LinkRecord::AlbumRef)
            .collect()
    }

    fn media_links(&self, document: &Html, caption_offset: usize) -> Vec<LinkRecord> {
        let images: Vec<_> = document.select(&ALBUM_PHOTO).collect();
        let alts: Vec<&str> = images
            .iter()
            .filter_map(|img| img.value().attr("alt"))
            .collect();

        // Captions belong to positions, so a dropped link must not shift them.
        images
            .iter()
            .enumerate()
            .filter_map(|(position, img)| {
                let caption = alts
                    .get(position)
                    .map_or_else(|| (caption_offset + position).to_string(), ToString::to_string);
                let url = self.resolve(img.value().attr("data-src")?)?;
                Some(LinkRecord::MediaRef(MediaRef::new(url, caption)))
            })
            .collect()
    }

    fn resolve(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() {
            return None;
        }
        self.base.join(href).ok().map(String::from)
    }
}

fn page_number(href: &str) -> u32 {
    PAGE_NUMBER_RE
        .captures(href)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(1)
}
