//! Feed synchronization passes.
//!
//! Subscriptions are processed one at a time, in subscription order.  A feed
//! that fails to fetch or parse is logged and skipped; its watermark is left
//! alone and the remaining feeds are still processed.
//!
//! ## For contributors
//!
//! There are two passes:
//!
//! * [`run_batch`] is the only writer of read state.  It downloads media,
//!   prints the console report and advances each watermark once that feed's
//!   pass has finished.
//! * [`snapshot`] backs the HTML view.  It takes the state by shared
//!   reference, downloads nothing and writes nothing.
//!
//! If you parallelise fetching, keep the per-subscription isolation: one
//! feed's failure must never change another feed's watermark or output.

use std::io::Write;
use std::path::Path;

use tracing::{info, warn};

use crate::media::{fetch_item_media, MediaOutcome};
use crate::present::{self, FeedView};
use crate::reconcile::reconcile;
use crate::source::{HttpClient, RssSource};
use crate::store::ApplicationState;

/// Counters for one batch pass, logged at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub synced: usize,
    pub failed: usize,
    pub unread: usize,
    pub media_downloaded: usize,
    pub media_failed: usize,
}

/// Everything a batch pass produced.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Views for the feeds that fetched successfully, in subscription order.
    pub feeds: Vec<FeedView>,
    pub summary: BatchSummary,
}

/// Fetch, reconcile and download every subscription, advancing watermarks in
/// `state` and writing the console report to `out`.
pub fn run_batch(
    state: &mut ApplicationState,
    client: &dyn HttpClient,
    download_dir: &Path,
    out: &mut dyn Write,
) -> BatchOutcome {
    let source = RssSource::new(client);
    let mut outcome = BatchOutcome::default();

    for subscription in &mut state.subscriptions {
        let document = match source.fetch(&subscription.url) {
            Ok(document) => document,
            Err(e) => {
                warn!(feed = %subscription.name, url = %subscription.url, "skipping feed: {e}");
                if let Err(e) = writeln!(out, "Error fetching RSS feed '{}': {e}", subscription.name) {
                    warn!(feed = %subscription.name, "failed to write report: {e}");
                }
                outcome.summary.failed += 1;
                continue;
            }
        };

        let pass = reconcile(subscription, &document);

        let media: Vec<Vec<MediaOutcome>> = pass
            .items
            .iter()
            .map(|item| fetch_item_media(client, download_dir, item))
            .collect();

        for result in media.iter().flatten().map(|m| &m.result) {
            match result {
                Ok(_) => outcome.summary.media_downloaded += 1,
                Err(_) => outcome.summary.media_failed += 1,
            }
        }

        let view = FeedView::build(&document, &pass.items);
        if let Err(e) = present::write_report(out, &view, &media) {
            warn!(feed = %subscription.name, "failed to write report: {e}");
        }

        info!(
            feed = %subscription.name,
            items = pass.items.len(),
            unread = pass.unread_count(),
            "synced feed"
        );

        outcome.summary.synced += 1;
        outcome.summary.unread += pass.unread_count();
        subscription.advance(&pass);
        outcome.feeds.push(view);
    }

    outcome
}

/// Build views for every subscription without touching read state or disk.
pub fn snapshot(state: &ApplicationState, client: &dyn HttpClient) -> Vec<FeedView> {
    let source = RssSource::new(client);

    state
        .subscriptions
        .iter()
        .filter_map(|subscription| match source.fetch(&subscription.url) {
            Ok(document) => {
                let pass = reconcile(subscription, &document);
                Some(FeedView::build(&document, &pass.items))
            }
            Err(e) => {
                warn!(feed = %subscription.name, url = %subscription.url, "skipping feed: {e}");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
