//! Feed source layer.
//!
//! This module defines the [`HttpClient`] seam and the [`FeedDocument`]
//! model.  Parsing lives in [`rss`], the production transport in [`http`].
//!
//! ## For contributors
//!
//! Everything that touches the network goes through [`HttpClient`], so the
//! sync pipeline can be driven by an in-memory client in tests.  Do not call
//! `reqwest` directly from anywhere else.

mod document;
mod http;
mod rss;

// Re-export the public API of this module so callers can write
// `use crate::source::{FeedDocument, HttpClient, RssSource};`
pub use self::document::{parse_pub_date, FeedDocument, Item, Media};
pub use self::http::ReqwestClient;
pub use self::rss::RssSource;

use std::io::Read;

use crate::error::TransportError;

/// Minimal blocking HTTP GET.
///
/// The returned body is a stream; dropping it releases the connection, so
/// callers scope it to the block that consumes it.
pub trait HttpClient {
    /// Issue a GET and return the body of a successful (2xx) response.
    fn get(&self, url: &str) -> Result<Box<dyn Read>, TransportError>;
}
