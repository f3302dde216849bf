//! Domain error types
//!
//! This module defines error types specific to domain operations,
//! including validation failures and malformed identifiers.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid remote path format
    #[error("Invalid remote path: {0}")]
    InvalidRemotePath(String),

    /// Invalid remote ID format
    #[error("Invalid remote ID: {0}")]
    InvalidRemoteId(String),

    /// Invalid content hash (expected 64 lowercase hex characters)
    #[error("Invalid content hash: {0}")]
    InvalidHash(String),

    /// Invalid cursor (expected a non-empty opaque token)
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// Generic validation failure, used by config validation
    #[error("Validation failed: {0}")]
    ValidationFailed(String),
}
