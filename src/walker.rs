//! Pagination walker.
//!
//! Fetches consecutive pages of one target and extracts their links until a
//! page comes back empty or the last advertised page has been read:
//!
//! ```text
//! NEXT_PAGE -> FETCH -> EXTRACT -> STOP | NEXT_PAGE
//!              FETCH failure -> STOP_WITH_ERROR
//! ```
//!
//! Records gathered before a failing page are kept in the outcome.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, instrument, warn};

use crate::fetch::{BlockAwareFetcher, FetchError};
use crate::parser::{LinkExtractor, LinkRecord, MediaRef, Target, TargetKind};

/// Bounds of the randomized pause between page fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDelay {
    min: Duration,
    max: Duration,
}

impl Default for PageDelay {
    fn default() -> Self {
        Self {
            min: Duration::from_secs(1),
            max: Duration::from_secs(5),
        }
    }
}

impl PageDelay {
    /// Creates delay bounds; `max` is raised to `min` if it is smaller.
    #[must_use]
    pub fn new(min: Duration, max: Duration) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    /// No pause at all.
    #[must_use]
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    /// Lower bound.
    #[must_use]
    pub fn min(&self) -> Duration {
        self.min
    }

    /// Upper bound.
    #[must_use]
    pub fn max(&self) -> Duration {
        self.max
    }

    /// Picks a delay uniformly from `[min, max]`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
    }

    /// Sleeps for a sampled delay.
    pub async fn pause(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            debug!(delay_ms = delay.as_millis(), "pausing between requests");
            tokio::time::sleep(delay).await;
        }
    }
}

/// Result of walking one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOutcome<T> {
    /// Records gathered, in page-discovery order.
    pub records: T,
    /// Pages that were fetched successfully.
    pub pages_fetched: u32,
    /// Fetch failure that ended the walk early, if any.
    pub error: Option<FetchError>,
}

impl<T> WalkOutcome<T> {
    /// True when the walk ran to its natural end.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }
}

/// Media items of one album, gathered across its pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlbumJob {
    /// The album URL without its page parameter.
    pub album_id: String,
    /// Media in page-discovery order.
    pub media: Vec<MediaRef>,
    /// False when a page failed before the walk reached its end.
    pub complete: bool,
}

/// Drives fetcher and extractor across the pages of one target.
#[derive(Debug, Clone)]
pub struct PaginationWalker {
    fetcher: BlockAwareFetcher,
    extractor: LinkExtractor,
    delay: PageDelay,
}

impl PaginationWalker {
    /// Creates a walker.
    #[must_use]
    pub fn new(fetcher: BlockAwareFetcher, extractor: LinkExtractor, delay: PageDelay) -> Self {
        Self {
            fetcher,
            extractor,
            delay,
        }
    }

    /// Pause used between pages, exposed so callers can also pace between albums.
    pub async fn pause(&self) {
        self.delay.pause().await;
    }

    /// Collects album URLs from every page of a listing.
    #[instrument(skip(self, target), fields(url = %target))]
    pub async fn walk_listing(&self, target: &Target) -> WalkOutcome<Vec<String>> {
        let (records, pages_fetched, error) = self.walk_pages(target, TargetKind::Listing).await;
        let albums = records
            .into_iter()
            .filter_map(|record| match record {
                LinkRecord::AlbumRef(url) => Some(url),
                LinkRecord::MediaRef(_) => None,
            })
            .collect::<Vec<_>>();
        info!(albums = albums.len(), pages_fetched, "listing walked");
        WalkOutcome {
            records: albums,
            pages_fetched,
            error,
        }
    }

    /// Collects media items from every page of an album.
    ///
    /// The caption counter carries across pages so synthesized captions stay
    /// unique within the album.
    #[instrument(skip(self, target), fields(url = %target))]
    pub async fn walk_album(&self, target: &Target) -> WalkOutcome<AlbumJob> {
        let (records, pages_fetched, error) = self.walk_pages(target, TargetKind::Album).await;
        let media = records
            .into_iter()
            .filter_map(|record| match record {
                LinkRecord::MediaRef(media) => Some(media),
                LinkRecord::AlbumRef(_) => None,
            })
            .collect::<Vec<_>>();
        info!(media = media.len(), pages_fetched, "album walked");
        WalkOutcome {
            records: AlbumJob {
                album_id: target.album_id(),
                media,
                complete: error.is_none(),
            },
            pages_fetched,
            error,
        }
    }

    async fn walk_pages(
        &self,
        target: &Target,
        kind: TargetKind,
    ) -> (Vec<LinkRecord>, u32, Option<FetchError>) {
        let mut records: Vec<LinkRecord> = Vec::new();
        let mut pages_fetched = 0;
        let mut page = target.start_page();

        loop {
            if pages_fetched > 0 {
                self.delay.pause().await;
            }

            let url = target.page_url(page);
            let content = match self.fetcher.fetch(&url).await {
                Ok(content) => content,
                Err(e) => {
                    warn!(url = %url, page, error = %e, "page fetch failed; stopping walk");
                    return (records, pages_fetched, Some(e));
                }
            };
            pages_fetched += 1;

            let found = self.extractor.extract(&content, kind, records.len());
            if found.is_empty() {
                debug!(page, "page has no links; stopping walk");
                break;
            }
            let max_page = self.extractor.max_page(&content);
            debug!(page, max_page, found = found.len(), "page extracted");
            records.extend(found);

            if page >= max_page {
                break;
            }
            page += 1;
        }

        (records, pages_fetched, None)
    }
}
