//! The closed error taxonomy for the remote client
//!
//! Every fallible operation in this crate returns [`RemoteError`]. The
//! variant set is closed deliberately: callers pattern-match on it to
//! decide whether to retry, surface a conflict, or give up.

use std::time::Duration;

use meridian_core::domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    /// No credential is stored for this account; [`crate::client::RemoteClient::link`]
    /// has not been completed.
    #[error("account is not linked")]
    NotLinked,

    /// The stored credential was rejected by the server.
    #[error("authentication failed: {0}")]
    AuthError(String),

    /// A path argument was rejected by the server (not a local validation failure).
    #[error("invalid path: {0}")]
    PathError(String),

    /// The requested item does not exist.
    #[error("not found: {0}")]
    NotFoundError(String),

    /// The account lacks permission for the requested operation.
    #[error("insufficient permissions: {0}")]
    InsufficientPermissionsError(String),

    /// The account has insufficient storage quota remaining.
    #[error("insufficient space")]
    InsufficientSpaceError,

    /// The file is too large for the attempted operation.
    #[error("file too large: {0}")]
    FileSizeError(String),

    /// The server rejected the content for policy reasons (e.g. malware scan).
    #[error("restricted content: {0}")]
    RestrictedContentError(String),

    /// The account's path root changed and the cached namespace is stale.
    #[error("path root error: {0}")]
    PathRootError(String),

    /// A write conflicted with a concurrent server-side change.
    #[error("sync error: {0}")]
    SyncError(String),

    /// A downloaded file's hash did not match the server's metadata after retrying.
    #[error("data corruption detected for {path}")]
    DataCorruptionError { path: String },

    /// A retryable transport-level failure (DNS, TLS, connection reset).
    #[error("network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// The connection could not be established at all.
    #[error("connection error: {0}")]
    ConnectionError(String),

    /// The server returned a 5xx response.
    #[error("remote server error: {0}")]
    RemoteServerError(String),

    /// The server reported the cursor is no longer valid and a fresh listing
    /// is required.
    #[error("cursor reset: {0}")]
    CursorResetError(String),

    /// A caller-supplied argument failed validation before any request was sent.
    #[error("bad input: {0}")]
    BadInputError(String),
}

impl RemoteError {
    /// Whether retrying the same request immediately has any chance of success.
    ///
    /// Mirrors the retry decision a [`crate::retry::RetryPolicy`] makes:
    /// transport failures and server errors are retried, everything else
    /// is returned to the caller immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::NetworkError(_)
                | RemoteError::ConnectionError(_)
                | RemoteError::RemoteServerError(_)
        )
    }

    /// Build a [`RemoteError::BadInputError`] from a [`DomainError`] raised
    /// while validating a caller-supplied value.
    pub fn bad_input(err: DomainError) -> Self {
        RemoteError::BadInputError(err.to_string())
    }
}

/// A rate-limit response the server asked us to back off for.
#[derive(Debug, Clone, Copy)]
pub struct TooManyRequests {
    pub retry_after: Duration,
}
