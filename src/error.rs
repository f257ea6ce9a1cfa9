//! Error types shared across the sync pipeline.
//!
//! Each stage has its own enum so callers can tell a recoverable condition
//! (a missing state file) from one that abandons a unit of work (a feed that
//! failed to parse, an attachment that failed to download).

use std::path::PathBuf;

use thiserror::Error;

/// Failure of the transport behind [`crate::source::HttpClient`].
#[derive(Error, Debug)]
#[error("{0}")]
pub struct TransportError(pub String);

/// Subscription store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No state file exists yet. Callers treat this as an empty state.
    #[error("state file {0} not found")]
    NotFound(PathBuf),

    /// The file exists but could not be read.
    #[error("failed to read state file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file was read but does not hold a valid state record.
    #[error("failed to decode state file {path}: {reason}")]
    Decode { path: PathBuf, reason: String },

    /// Encoding or writing the new state failed.
    #[error("failed to write state file {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Errors fetching one subscription's feed document.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl From<TransportError> for FetchError {
    fn from(e: TransportError) -> Self {
        FetchError::Network(e.0)
    }
}

/// Errors retrieving one media attachment.
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("network error: {0}")]
    Network(String),

    #[error("disk write error for {path}: {source}")]
    DiskWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<TransportError> for MediaError {
    fn from(e: TransportError) -> Self {
        MediaError::Network(e.0)
    }
}
