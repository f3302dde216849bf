//! Credential storage port
//!
//! The Remote Client Layer never persists tokens itself; it reads and
//! writes them through this trait so the embedding application can back
//! it with a keyring, an encrypted file, or anything else.

use async_trait::async_trait;

use crate::domain::DomainError;

/// The kind of credential stored under an account, mirroring the shape
/// OAuth2 token responses take: a long-lived refresh token and a
/// short-lived access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Refresh,
    Access,
}

/// A stored OAuth2 token set for one linked account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

/// Errors a [`CredentialStore`] implementation may return.
#[derive(Debug, thiserror::Error)]
pub enum CredentialStoreError {
    #[error("no credential stored for account: {0}")]
    NotFound(String),

    #[error("credential backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

/// Persists OAuth2 credentials for a linked account.
///
/// Implementations must treat stored tokens as secrets: they should not
/// be logged and should be erased on [`CredentialStore::delete`].
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Load the credential for `account_id`, if one has been stored.
    async fn load(&self, account_id: &str) -> Result<Option<Credential>, CredentialStoreError>;

    /// Store or replace the credential for `account_id`.
    async fn store(
        &self,
        account_id: &str,
        credential: &Credential,
    ) -> Result<(), CredentialStoreError>;

    /// Remove any credential stored for `account_id`.
    async fn delete(&self, account_id: &str) -> Result<(), CredentialStoreError>;
}
