//! RSS feed source implementation.
//!
//! Turns raw RSS bytes into a [`FeedDocument`], including Media RSS
//! attachments (`<media:content>`, optionally wrapped in `<media:group>`).
//!
//! ## For contributors — adding a new format
//!
//! 1. Create a new file under `src/source/` (e.g. `atom.rs`).
//! 2. Write a pure `parse_*` function from bytes to [`FeedDocument`] so it can
//!    be tested without the network.
//! 3. Fetch the bytes through [`HttpClient`] exactly as [`RssSource::fetch`]
//!    does, so timeouts and size limits stay in one place.

use std::io::Read;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::debug;

use super::document::{parse_pub_date, FeedDocument, Item, Media};
use super::HttpClient;
use crate::error::FetchError;

/// Namespace URI of the Media RSS extension.
pub const MEDIA_RSS_NAMESPACE: &str = "http://search.yahoo.com/mrss/";

/// Feeds larger than this are refused rather than buffered.
pub const MAX_FEED_SIZE: u64 = 10 * 1024 * 1024;

/// Prefix assumed for Media RSS when the feed does not declare one.
const DEFAULT_MEDIA_PREFIX: &str = "media";

/// An RSS feed source bound to an HTTP client.
pub struct RssSource<'a> {
    client: &'a dyn HttpClient,
}

impl<'a> RssSource<'a> {
    pub fn new(client: &'a dyn HttpClient) -> Self {
        Self { client }
    }

    /// Fetch `url` and parse the body as RSS.
    ///
    /// The response body is dropped before parsing starts, whether or not the
    /// read succeeded.
    pub fn fetch(&self, url: &str) -> Result<FeedDocument, FetchError> {
        let bytes = {
            let body = self.client.get(url)?;
            let mut buf = Vec::new();
            body.take(MAX_FEED_SIZE + 1)
                .read_to_end(&mut buf)
                .map_err(|e| FetchError::Network(format!("failed to read response: {e}")))?;
            buf
        };

        if bytes.len() as u64 > MAX_FEED_SIZE {
            return Err(FetchError::Network(format!(
                "feed too large: more than {MAX_FEED_SIZE} bytes"
            )));
        }

        debug!(url, bytes = bytes.len(), "fetched feed");
        parse_document(&bytes)
    }

    /// Map an already-parsed [`rss::Channel`] into a [`FeedDocument`].
    ///
    /// `media` holds each item's attachments, indexed like
    /// `channel.items()`.  This is a pure function (no I/O) so that tests
    /// can exercise the mapping without hitting the network.
    fn parse_channel(channel: &rss::Channel, media: Vec<Vec<Media>>) -> FeedDocument {
        let mut media = media.into_iter();

        let items = channel
            .items()
            .iter()
            .map(|item| {
                let pub_date = item.pub_date().unwrap_or_default().to_string();
                Item {
                    title: item.title().unwrap_or_default().to_string(),
                    description: item.description().unwrap_or_default().to_string(),
                    link: item.link().unwrap_or_default().to_string(),
                    published: parse_pub_date(&pub_date),
                    pub_date,
                    media: media.next().unwrap_or_default(),
                }
            })
            .collect();

        FeedDocument {
            title: channel.title().to_string(),
            description: channel.description().to_string(),
            link: channel.link().to_string(),
            items,
        }
    }
}

/// Parse raw bytes as an RSS document.
pub fn parse_document(bytes: &[u8]) -> Result<FeedDocument, FetchError> {
    let channel = rss::Channel::read_from(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
    let media = scan_media(bytes).map_err(|e| FetchError::Parse(e.to_string()))?;
    Ok(RssSource::parse_channel(&channel, media))
}

/// Collect every item's `<media:content>` elements in document order,
/// whether they sit directly in the item or inside a `<media:group>`.
///
/// The channel parser files extension elements by name, which loses the
/// order between groups and direct content, so this walks the raw XML.
fn scan_media(bytes: &[u8]) -> Result<Vec<Vec<Media>>, quick_xml::Error> {
    let mut reader = NsReader::from_reader(bytes);
    let mut items = Vec::new();
    let mut current: Option<Vec<Media>> = None;

    loop {
        let (ns, event) = reader.read_resolved_event()?;
        let in_media_ns = is_media_rss(&ns);

        match event {
            Event::Start(e) if !in_media_ns && e.local_name().as_ref() == b"item" => {
                current = Some(Vec::new());
            }
            Event::Empty(e) if !in_media_ns && e.local_name().as_ref() == b"item" => {
                items.push(Vec::new());
            }
            Event::End(e) if !in_media_ns && e.local_name().as_ref() == b"item" => {
                items.push(current.take().unwrap_or_default());
            }
            Event::Start(e) | Event::Empty(e)
                if in_media_ns && e.local_name().as_ref() == b"content" =>
            {
                if let (Some(media), Some(found)) = (current.as_mut(), media_from_element(&e)) {
                    media.push(found);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(items)
}

/// Whether an element belongs to Media RSS.  An undeclared `media:` prefix
/// is accepted too; publishers forget the declaration often enough.
fn is_media_rss(ns: &ResolveResult<'_>) -> bool {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => *uri == MEDIA_RSS_NAMESPACE.as_bytes(),
        ResolveResult::Unknown(prefix) => prefix.as_slice() == DEFAULT_MEDIA_PREFIX.as_bytes(),
        ResolveResult::Unbound => false,
    }
}

fn media_from_element(element: &BytesStart<'_>) -> Option<Media> {
    let mut media = Media::default();

    for attr in element.attributes().flatten() {
        let Ok(value) = attr.unescape_value() else {
            continue;
        };
        match attr.key.local_name().as_ref() {
            b"url" => media.url = value.trim().to_string(),
            b"type" => media.mime_type = Some(value.into_owned()),
            b"width" => media.width = value.trim().parse().ok(),
            b"height" => media.height = value.trim().parse().ok(),
            _ => {}
        }
    }

    (!media.url.is_empty()).then_some(media)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
