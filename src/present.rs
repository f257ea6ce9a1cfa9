//! Render model shared by the console report and the HTML page.
//!
//! Building a [`FeedView`] is a pure mapping from reconciled items; it does
//! no I/O and never touches read state.  Only the first attachment of an
//! item is surfaced.

use std::io::{self, Write};

use serde::Serialize;

use crate::media::MediaOutcome;
use crate::reconcile::{AnnotatedItem, Status};
use crate::source::FeedDocument;

/// One feed, ready for a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedView {
    pub title: String,
    pub description: String,
    pub link: String,
    pub items: Vec<ItemView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemView {
    pub title: String,
    pub description: String,
    pub link: String,
    pub pub_date: String,
    pub status: Status,
    pub has_media: bool,
    pub media_url: Option<String>,
}

impl FeedView {
    pub fn build(document: &FeedDocument, items: &[AnnotatedItem<'_>]) -> Self {
        Self {
            title: document.title.clone(),
            description: document.description.clone(),
            link: document.link.clone(),
            items: items.iter().map(ItemView::from).collect(),
        }
    }
}

impl From<&AnnotatedItem<'_>> for ItemView {
    fn from(annotated: &AnnotatedItem<'_>) -> Self {
        let item = annotated.item;
        Self {
            title: item.title.clone(),
            description: item.description.clone(),
            link: item.link.clone(),
            pub_date: item.pub_date.clone(),
            status: annotated.status,
            has_media: annotated.has_media,
            media_url: item.media.first().map(|m| m.url.clone()),
        }
    }
}

/// Write the batch-mode console report for one feed.
///
/// `media` holds the download outcomes for each item, indexed like
/// `feed.items`; missing entries mean nothing was downloaded.
pub fn write_report(
    out: &mut dyn Write,
    feed: &FeedView,
    media: &[Vec<MediaOutcome>],
) -> io::Result<()> {
    writeln!(out, "Feed Title: {}", feed.title)?;
    writeln!(out, "Feed Description: {}", feed.description)?;
    writeln!(out, "Feed Link: {}", feed.link)?;
    writeln!(out)?;
    writeln!(out, "Items:")?;

    for (i, item) in feed.items.iter().enumerate() {
        writeln!(out, "Title: {}", item.title)?;
        writeln!(out, "Description: {}", item.description)?;
        writeln!(out, "Link: {}", item.link)?;
        writeln!(out, "Published: {}", item.pub_date)?;
        writeln!(out, "Status: {}", item.status)?;

        for outcome in media.get(i).into_iter().flatten() {
            match &outcome.result {
                Ok(_) => writeln!(
                    out,
                    "Media downloaded for '{}': {}",
                    item.title,
                    outcome.path.display()
                )?,
                Err(e) => writeln!(
                    out,
                    "Error downloading media for '{}' from {}: {e}",
                    item.title, outcome.url
                )?,
            }
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
