//! Library error type
//!
//! Configuration loading and strict token decoding return [`Error`]; storage
//! backends return [`StorageError`]. The engine API absorbs expected failures
//! into warnings plus a fallback.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read configuration from {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration from {origin}")]
    ConfigParse {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to fetch {url}: {reason}")]
    ConfigFetch { url: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to decode state token: {0}")]
    Decode(String),
}

/// Failures reported by a [`KeyValueStorage`](crate::persistence::KeyValueStorage) backend
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("durable storage is not available")]
    Unavailable,

    #[error("storage I/O failed for {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage contents are corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("storage backend rejected the operation: {0}")]
    Backend(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
