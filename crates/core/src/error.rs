//! Unified error types for the wayfinder engine.
//!
//! Display strings carry a stable machine-readable prefix so callers can
//! classify failures without matching on variants across crate versions.

use tokio_rusqlite::rusqlite;

/// Unified error type shared by the cache store and the resolver.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed snapshot, candidate list, or intent. Rejected before any
    /// resolution stage runs.
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// A stored entry failed to deserialize. Internal: the cache degrades
    /// this to a miss and drops the row; it never escapes a resolve call.
    #[error("CACHE_CORRUPT: {0}")]
    EntryCorrupt(String),

    /// The external AI adapter was unreachable.
    #[error("AI_UNAVAILABLE: {0}")]
    AiUnavailable(String),

    /// The external AI adapter exceeded the configured deadline.
    /// Retryable; the resolver itself never retries.
    #[error("AI_TIMEOUT: exceeded {0}ms")]
    AiTimeout(u64),

    /// The caller's cancellation flag was set between stages.
    #[error("CANCELLED")]
    Cancelled,
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
