//! The in-memory shape of a fetched feed.
//!
//! A [`FeedDocument`] is rebuilt on every fetch and never persisted.  Items
//! keep the order the publisher gave them; nothing downstream re-sorts them.
//!
//! ## For contributors
//!
//! Parsers for other formats only need to produce these types.  The
//! reconciliation engine looks at [`Item::published`] and nothing else, so a
//! new format must fill it in whenever the source carries a date.

use chrono::{DateTime, Utc};

/// A feed channel together with its items, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    pub title: String,
    pub description: String,
    pub link: String,
    pub items: Vec<Item>,
}

/// A single feed entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Item {
    pub title: String,
    pub description: String,
    pub link: String,

    /// Publication date exactly as the feed wrote it, shown to readers.
    pub pub_date: String,

    /// Parsed form of [`pub_date`](Item::pub_date).
    ///
    /// `None` when the feed gave no date or one we could not parse.  Such
    /// items are always treated as unread.
    pub published: Option<DateTime<Utc>>,

    /// Attachments in document order.
    pub media: Vec<Media>,
}

/// A media attachment referenced by an item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Media {
    pub url: String,
    pub mime_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl Item {
    pub fn has_media(&self) -> bool {
        !self.media.is_empty()
    }
}

/// Parse a publication date in either of the formats feeds use in practice.
///
/// RSS specifies RFC 2822, but plenty of publishers emit RFC 3339 instead.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
