//! Unified error types for shellcache.
//!
//! Every variant renders with a stable code prefix so callers can match on
//! the code without parsing the message.

use tokio_rusqlite::rusqlite;

use crate::lifecycle::WorkerState;

/// Unified error types for the shellcache gateway and engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input (malformed control message, push payload, request).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Requested item does not exist (notification id, cache store).
    #[error("NOT_FOUND: {0}")]
    NotFound(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry could not be decoded.
    #[error("CACHE_ERROR: corrupt entry: {0}")]
    CorruptEntry(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The network request could not be completed.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// A worker was asked to make a lifecycle transition it cannot make.
    #[error("LIFECYCLE_ERROR: cannot move from {from} to {to}")]
    Lifecycle { from: WorkerState, to: WorkerState },
}

impl Error {
    /// Stable error code, the prefix of the display string.
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => "CACHE_ERROR",
            Error::InvalidUrl(_) => "INVALID_URL",
            Error::Network(_) => "NETWORK_ERROR",
            Error::FetchTooLarge(_) => "FETCH_TOO_LARGE",
            Error::Lifecycle { .. } => "LIFECYCLE_ERROR",
        }
    }

    /// Whether this error means the network could not produce a response.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_) | Error::FetchTooLarge(_))
    }
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
            tokio_rusqlite::Error::Close(c) => Error::Database(tokio_rusqlite::Error::Close(c)),
            _ => Error::Database(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::Database(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(tokio_rusqlite::Error::Error(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::CorruptEntry(err.to_string())
    }
}
