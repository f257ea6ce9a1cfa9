//! Read-state reconciliation.
//!
//! Compares a freshly fetched [`FeedDocument`] against a subscription's
//! watermark.  An item is read iff it has a publication time at or before
//! the watermark; anything undated is unread.  This holds no matter how the
//! publisher reorders, inserts or drops items between runs.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::source::{FeedDocument, Item};
use crate::store::Subscription;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    Read,
    Unread,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Read => f.write_str("Read"),
            Status::Unread => f.write_str("Unread"),
        }
    }
}

/// An item with its derived read status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatedItem<'a> {
    pub item: &'a Item,
    pub status: Status,
    pub has_media: bool,
}

/// Result of one reconciliation pass.  Nothing is written to the
/// subscription until [`Subscription::advance`] is called with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation<'a> {
    /// Same order as the document.
    pub items: Vec<AnnotatedItem<'a>>,
    pub watermark: Option<DateTime<Utc>>,
    pub last_read_index: Option<usize>,
}

impl Reconciliation<'_> {
    pub fn unread_count(&self) -> usize {
        self.items.iter().filter(|i| i.status == Status::Unread).count()
    }
}

/// Classify `document`'s items against `subscription`'s watermark and compute
/// the next watermark.
pub fn reconcile<'a>(subscription: &Subscription, document: &'a FeedDocument) -> Reconciliation<'a> {
    let watermark = subscription.last_read;

    let items = document
        .items
        .iter()
        .map(|item| AnnotatedItem {
            item,
            status: status_of(item, watermark),
            has_media: item.has_media(),
        })
        .collect();

    let newest = document.items.iter().filter_map(|i| i.published).max();
    let last_index = document.items.len().checked_sub(1);

    Reconciliation {
        items,
        watermark: watermark.max(newest),
        last_read_index: subscription.last_read_index.max(last_index),
    }
}

fn status_of(item: &Item, watermark: Option<DateTime<Utc>>) -> Status {
    match (item.published, watermark) {
        (Some(published), Some(watermark)) if published <= watermark => Status::Read,
        _ => Status::Unread,
    }
}

impl Subscription {
    /// Record a completed reconciliation pass.
    pub fn advance(&mut self, pass: &Reconciliation<'_>) {
        self.last_read = self.last_read.max(pass.watermark);
        self.last_read_index = self.last_read_index.max(pass.last_read_index);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
