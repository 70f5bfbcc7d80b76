//! Unified error types for fixie-sw.
//!
//! Display strings carry a stable upper-case code prefix so hosts can match
//! on them without parsing the message.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the offline cache worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No entry stored for the requested key.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// Database operation failed.
    #[error("CACHE_ERROR: {0}")]
    Database(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("CACHE_ERROR: migration failed: {0}")]
    MigrationFailed(String),

    /// The network could not be reached or the transfer broke off.
    #[error("NETWORK_UNAVAILABLE: {0}")]
    NetworkUnavailable(String),

    /// A network attempt exceeded its time budget.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Response body exceeded the configured limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Neither the cache nor the network could satisfy the request.
    #[error("NO_FALLBACK_AVAILABLE: {0}")]
    NoFallbackAvailable(String),

    /// Static precache failed, so the generation cannot be installed.
    #[error("INSTALL_FAILED: {0}")]
    InstallPopulationFailure(String),

    /// Lifecycle event not valid in the current state.
    #[error("INVALID_STATE: {0}")]
    InvalidState(String),

    /// The worker event loop has shut down.
    #[error("WORKER_STOPPED")]
    WorkerStopped,
}

impl Error {
    /// Whether the error means "the network did not answer".
    ///
    /// Strategies treat these as recoverable and fall back to the cache.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Error::NetworkUnavailable(_) | Error::FetchTimeout(_) | Error::FetchTooLarge(_))
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

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::Database(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::NetworkUnavailable(msg) => (-32008, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::NoFallbackAvailable(msg) => (-32013, msg.clone()),
            Error::InstallPopulationFailure(msg) => (-32014, msg.clone()),
            Error::InvalidState(msg) => (-32015, msg.clone()),
            Error::WorkerStopped => (-32016, "Worker event loop has stopped".to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
