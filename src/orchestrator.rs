//! Run orchestration: walks every target, gates albums on the ledger, and
//! feeds the download worker.
//!
//! # Flow
//!
//! ```text
//! Listing -> walk_listing -> [album URLs] --+
//! Album   ---------------------------------+-> seen? -> walk_album -> enqueue -> record
//! ```
//!
//! Pages are fetched by this task; media is downloaded by the single queue
//! worker. [`Orchestrator::run`] returns only after the queue has drained.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, error, info, instrument, warn};

use crate::config::{ConfigError, Settings};
use crate::download::{DownloadQueue, DownloadTask, TaskHandler, WorkerReport, album_folder_name};
use crate::fetch::{BlockAwareFetcher, RenderSession};
use crate::ledger::{DedupLedger, LedgerPolicy};
use crate::parser::{LinkExtractor, Target, TargetKind};
use crate::walker::PaginationWalker;

/// Counters for one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Targets processed.
    pub targets: usize,
    /// Targets that yielded nothing because their first fetch failed.
    pub targets_failed: usize,
    /// Albums whose pages were walked.
    pub albums_walked: usize,
    /// Albums handed to the download queue.
    pub albums_enqueued: usize,
    /// Albums skipped because the ledger already had them.
    pub albums_skipped: usize,
    /// Albums that produced no media.
    pub albums_failed: usize,
    /// Media items fetched.
    pub items_downloaded: usize,
    /// Media items already on disk.
    pub items_skipped: usize,
    /// Media items that failed.
    pub items_failed: usize,
    /// Bytes written.
    pub bytes: u64,
}

impl RunSummary {
    /// True when at least one target was given and none of them produced anything.
    #[must_use]
    pub fn all_targets_failed(&self) -> bool {
        self.targets > 0 && self.targets_failed == self.targets
    }

    fn absorb_worker(&mut self, report: &WorkerReport) {
        self.items_downloaded += report.downloaded;
        self.items_skipped += report.skipped;
        self.items_failed += report.failed;
        self.bytes += report.bytes;
    }
}

/// Outcome of processing one album.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlbumOutcome {
    Enqueued,
    Skipped,
    Failed,
}

/// Composes walker, ledger and download queue for one invocation.
pub struct Orchestrator<H: TaskHandler> {
    walker: PaginationWalker,
    ledger: DedupLedger,
    settings: Settings,
    handler: H,
}

impl<H: TaskHandler> std::fmt::Debug for Orchestrator<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("walker", &self.walker)
            .field("ledger", &self.ledger)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl<H: TaskHandler> Orchestrator<H> {
    /// Builds the pipeline from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] if the settings are out of range.
    pub fn new(
        settings: Settings,
        session: Arc<dyn RenderSession>,
        handler: H,
    ) -> Result<Self, ConfigError> {
        settings.validate()?;
        let fetcher = BlockAwareFetcher::new(session, settings.retry_policy());
        let extractor = LinkExtractor::new(settings.base_url()?);
        let walker = PaginationWalker::new(fetcher, extractor, settings.page_delay());
        let ledger = DedupLedger::new(&settings.ledger_path);
        Ok(Self {
            walker,
            ledger,
            settings,
            handler,
        })
    }

    /// Ledger used for dedup.
    #[must_use]
    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Processes every target in order, then drains the download queue.
    ///
    /// Per-target failures are logged and counted; they never stop the run.
    #[instrument(skip_all, fields(targets = targets.len(), dry_run = self.settings.dry_run))]
    pub async fn run(self, targets: &[Target]) -> RunSummary {
        let Self {
            walker,
            ledger,
            settings,
            handler,
        } = self;

        let queue = if settings.dry_run {
            None
        } else {
            let completion_ledger =
                (settings.ledger_policy == LedgerPolicy::OnCompletion).then(|| ledger.clone());
            Some(DownloadQueue::spawn(
                handler,
                settings.queue_capacity,
                completion_ledger,
            ))
        };

        let run = Run {
            walker: &walker,
            ledger: &ledger,
            settings: &settings,
            queue: queue.as_ref(),
        };
        let mut summary = RunSummary::default();
        let mut visited = HashSet::new();

        for (index, target) in targets.iter().enumerate() {
            if index > 0 {
                walker.pause().await;
            }
            summary.targets += 1;
            let produced = match target.kind() {
                TargetKind::Listing => run.listing(target, &mut visited, &mut summary).await,
                TargetKind::Album => {
                    run.album(target, &mut visited, &mut summary).await != AlbumOutcome::Failed
                }
            };
            if !produced {
                summary.targets_failed += 1;
            }
        }

        if let Some(queue) = queue {
            info!("all targets walked; waiting for downloads to finish");
            match queue.shutdown().await {
                Ok(report) => summary.absorb_worker(&report),
                Err(e) => error!(error = %e, "download worker failed"),
            }
        }

        info!(
            targets = summary.targets,
            targets_failed = summary.targets_failed,
            albums_enqueued = summary.albums_enqueued,
            albums_skipped = summary.albums_skipped,
            albums_failed = summary.albums_failed,
            items_downloaded = summary.items_downloaded,
            items_skipped = summary.items_skipped,
            items_failed = summary.items_failed,
            bytes = summary.bytes,
            "run finished"
        );
        summary
    }
}

/// Borrowed view of the pipeline while targets are processed.
struct Run<'a> {
    walker: &'a PaginationWalker,
    ledger: &'a DedupLedger,
    settings: &'a Settings,
    queue: Option<&'a DownloadQueue>,
}

impl Run<'_> {
    /// Returns false when the listing yielded no albums because a fetch failed.
    async fn listing(
        &self,
        target: &Target,
        visited: &mut HashSet<String>,
        summary: &mut RunSummary,
    ) -> bool {
        let outcome = self.walker.walk_listing(target).await;
        if let Some(e) = &outcome.error {
            warn!(listing = %target, error = %e, albums = outcome.records.len(), "listing walk stopped early");
            if outcome.records.is_empty() {
                return false;
            }
        }

        let albums: Vec<Target> = outcome
            .records
            .iter()
            .filter_map(|href| match listed_album(href) {
                Some(album) => Some(album),
                None => {
                    warn!(href = %href, "listing link is not an album; ignoring");
                    None
                }
            })
            .collect();

        if self.settings.dry_run {
            for album in &albums {
                info!(album = %album, "album found");
            }
            return true;
        }

        for (index, album) in albums.iter().enumerate() {
            if index > 0 {
                self.walker.pause().await;
            }
            self.album(album, visited, summary).await;
        }
        true
    }

    async fn album(
        &self,
        target: &Target,
        visited: &mut HashSet<String>,
        summary: &mut RunSummary,
    ) -> AlbumOutcome {
        let album_id = target.album_id();
        if !visited.insert(album_id.clone()) {
            debug!(album = %album_id, "album already handled in this run");
            return AlbumOutcome::Skipped;
        }

        match self.ledger.seen(&album_id).await {
            Ok(true) => {
                info!(album = %album_id, "album already downloaded; skipping");
                summary.albums_skipped += 1;
                return AlbumOutcome::Skipped;
            }
            Ok(false) => {}
            Err(e) => warn!(album = %album_id, error = %e, "ledger unreadable; treating album as new"),
        }

        let outcome = self.walker.walk_album(target).await;
        summary.albums_walked += 1;
        let job = outcome.records;
        if job.media.is_empty() {
            match &outcome.error {
                Some(e) => warn!(album = %album_id, error = %e, "album walk failed"),
                None => warn!(album = %album_id, "album has no media"),
            }
            summary.albums_failed += 1;
            return AlbumOutcome::Failed;
        }

        let folder = album_folder_name(
            job.media.first().map(|m| m.caption.as_str()),
            target.slug(),
        );

        let Some(queue) = self.queue else {
            info!(album = %album_id, folder = %folder, media = job.media.len(), complete = job.complete, "album walked (dry run)");
            for media in &job.media {
                info!(url = %media.url, caption = %media.caption, "media found");
            }
            return AlbumOutcome::Enqueued;
        };

        let policy = self.settings.ledger_policy;
        let task = DownloadTask {
            album_id: album_id.clone(),
            folder,
            items: job.media,
            record_on_completion: policy == LedgerPolicy::OnCompletion && job.complete,
        };
        if let Err(e) = queue.enqueue(task).await {
            error!(album = %album_id, error = %e, "could not enqueue album");
            summary.albums_failed += 1;
            return AlbumOutcome::Failed;
        }
        summary.albums_enqueued += 1;

        if !job.complete {
            warn!(album = %album_id, "album partially walked; not recording in ledger");
        } else if policy == LedgerPolicy::OnEnqueue
            && let Err(e) = self.ledger.record(&album_id).await
        {
            warn!(album = %album_id, error = %e, "failed to record album");
        }
        AlbumOutcome::Enqueued
    }
}

/// Parses a listing href as an album target starting at its first page.
fn listed_album(href: &str) -> Option<Target> {
    let target = Target::parse(href).ok()?;
    if target.kind() != TargetKind::Album {
        return None;
    }
    if target.start_page() == 1 {
        Some(target)
    } else {
        Target::parse(&target.album_id()).ok()
    }
}
