//! Unified error types for offcache.
//!
//! Every variant renders with a stable upper-case code prefix so that logs
//! and MCP error payloads can be matched on without parsing free text.

use rmcp::model::{ErrorCode, ErrorData as McpError};
use tokio_rusqlite::rusqlite;

/// Unified error types for the request-cache layer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid input parameters (e.g., empty URL).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Invalid or unresolvable URL.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// No cache entry found for the given request identity.
    #[error("CACHE_MISS: {0}")]
    CacheMiss(String),

    /// The backing store could not be read or written.
    ///
    /// Callers on the request path treat this as a cache miss.
    #[error("STORAGE_UNAVAILABLE: {0}")]
    StorageUnavailable(tokio_rusqlite::Error),

    /// Migration failed to apply.
    #[error("STORAGE_UNAVAILABLE: migration failed: {0}")]
    MigrationFailed(String),

    /// Connection error, refused request, or unreadable body.
    #[error("NETWORK_FAILURE: {0}")]
    NetworkFailure(String),

    /// The network did not answer within the configured timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Response body exceeded the configured byte limit.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// One or more manifest assets could not be fetched during install.
    #[error("INSTALL_FAILED: {0}")]
    InstallPopulationFailure(String),

    /// Activation was requested without an installed generation, or cleanup failed.
    #[error("ACTIVATION_FAILED: {0}")]
    ActivationFailed(String),

    /// Push payload could not be decoded.
    #[error("MALFORMED_PUSH: {0}")]
    MalformedPushPayload(String),
}

impl From<tokio_rusqlite::Error<Error>> for Error {
    fn from(err: tokio_rusqlite::Error<Error>) -> Self {
        match err {
            tokio_rusqlite::Error::Error(e) => e,
            tokio_rusqlite::Error::ConnectionClosed => {
                Error::StorageUnavailable(tokio_rusqlite::Error::ConnectionClosed)
            }
            tokio_rusqlite::Error::Close(c) => Error::StorageUnavailable(tokio_rusqlite::Error::Close(c)),
            _ => Error::StorageUnavailable(tokio_rusqlite::Error::ConnectionClosed),
        }
    }
}

impl From<tokio_rusqlite::Error<rusqlite::Error>> for Error {
    fn from(err: tokio_rusqlite::Error<rusqlite::Error>) -> Self {
        Error::StorageUnavailable(err)
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::StorageUnavailable(tokio_rusqlite::Error::Error(err))
    }
}

impl From<Error> for McpError {
    fn from(err: Error) -> Self {
        let (code, message) = match &err {
            Error::InvalidInput(msg) => (-32602, msg.clone()),
            Error::InvalidUrl(msg) => (-32003, msg.clone()),
            Error::CacheMiss(msg) => (-32001, msg.clone()),
            Error::StorageUnavailable(e) => (-32002, e.to_string()),
            Error::MigrationFailed(msg) => (-32002, msg.clone()),
            Error::NetworkFailure(msg) => (-32008, msg.clone()),
            Error::FetchTimeout(msg) => (-32006, msg.clone()),
            Error::FetchTooLarge(msg) => (-32007, msg.clone()),
            Error::InstallPopulationFailure(msg) => (-32013, msg.clone()),
            Error::ActivationFailed(msg) => (-32014, msg.clone()),
            Error::MalformedPushPayload(msg) => (-32015, msg.clone()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
