//! State storage port
//!
//! A small key/value facts store the Remote Client Layer uses to persist
//! the handful of strings it cannot safely rediscover on every restart:
//! the last cursor seen, the account's path root, and similar single
//! values. It is deliberately not a database: callers needing a real
//! index or conflict log own that themselves.

use async_trait::async_trait;

/// Errors a [`StateStore`] implementation may return.
#[derive(Debug, thiserror::Error)]
pub enum StateStoreError {
    #[error("state store backend error: {0}")]
    Backend(String),
}

/// Persists small string facts, namespaced by section and key.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the value stored under `(section, key)`, if any.
    async fn get(&self, section: &str, key: &str) -> Result<Option<String>, StateStoreError>;

    /// Store `value` under `(section, key)`, replacing any existing value.
    async fn set(&self, section: &str, key: &str, value: &str) -> Result<(), StateStoreError>;

    /// Remove the value stored under `(section, key)`, if any.
    async fn clear(&self, section: &str, key: &str) -> Result<(), StateStoreError>;
}
