//! Unified error types for the haven worker.
//!
//! Every variant renders with a stable code prefix so hosts can match on
//! the message, and carries a numeric code for `failed` fetch outcomes.

use tokio_rusqlite::rusqlite;

/// Unified error types for the haven worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input (e.g., a malformed event payload).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unresolvable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// The network request could not be completed.
    #[error("NETWORK_ERROR: {0}")]
    Network(String),

    /// HTTP-level failure (e.g., an unusable status during pre-caching).
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Fetch timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Fetch response too large.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Cache database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// Host key-value storage held something unusable.
    #[error("STORAGE_ERROR: {0}")]
    Storage(String),

    /// Inbound client message could not be understood.
    #[error("INVALID_MESSAGE: {0}")]
    InvalidMessage(String),
}

impl Error {
    /// Numeric code reported to the host alongside the message.
    pub fn code(&self) -> i32 {
        match self {
            Error::InvalidInput(_) => -32602,
            Error::InvalidUrl(_) => -32003,
            Error::Network(_) => -32010,
            Error::HttpError(_) => -32008,
            Error::FetchTimeout(_) => -32006,
            Error::FetchTooLarge(_) => -32007,
            Error::Database(_) | Error::MigrationFailed(_) => -32002,
            Error::Storage(_) => -32020,
            Error::InvalidMessage(_) => -32021,
        }
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
        Error::InvalidInput(err.to_string())
    }
}
