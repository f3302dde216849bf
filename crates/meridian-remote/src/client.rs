//! The top-level remote client: session lifecycle and linking
//!
//! [`RemoteClient`] owns the lazily-initialized [`Session`] and the handful
//! of account facts (namespace id, team-space flag) that outlive any single
//! request. Folder listing, transfers, and batch operations are plain
//! functions in their own modules that take a `&Session`; this aggregate's
//! job is producing that session and keeping the account facts in sync
//! with the server.

use std::sync::Arc;

use meridian_core::config::RetryConfig;
use meridian_core::ports::{Credential, CredentialStore, CredentialStoreError, StateStore};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::RemoteError;
use crate::session::Session;
use crate::types::{RootInfo, UserInfo};

const GET_CURRENT_ACCOUNT_PATH: &str = "/users/get_current_account";
const TOKEN_REVOKE_PATH: &str = "/auth/token/revoke";

const STATE_SECTION: &str = "account";
const STATE_KEY_PATH_ROOT_NSID: &str = "path_root_nsid";
const STATE_KEY_PATH_ROOT_TYPE: &str = "path_root_type";
const STATE_KEY_EMAIL: &str = "email";
const STATE_KEY_DISPLAY_NAME: &str = "display_name";

#[derive(Debug, Deserialize)]
#[serde(tag = ".tag", rename_all = "snake_case")]
enum RootInfoDto {
    User {
        root_namespace_id: String,
        home_namespace_id: String,
    },
    Team {
        root_namespace_id: String,
        home_namespace_id: String,
    },
}

impl RootInfoDto {
    fn home_namespace_id(&self) -> &str {
        match self {
            RootInfoDto::User { home_namespace_id, .. } => home_namespace_id,
            RootInfoDto::Team { home_namespace_id, .. } => home_namespace_id,
        }
    }

    fn is_team(&self) -> bool {
        matches!(self, RootInfoDto::Team { .. })
    }

    fn root_namespace_id(&self) -> &str {
        match self {
            RootInfoDto::User { root_namespace_id, .. } => root_namespace_id,
            RootInfoDto::Team { root_namespace_id, .. } => root_namespace_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountInfoResponse {
    account_id: String,
    email: String,
    display_name: String,
    quota_used: u64,
    quota_total: u64,
    root_info: RootInfoDto,
}

/// Facts about the account's root namespace, cached after linking or a
/// call to [`RemoteClient::update_path_root`].
#[derive(Debug, Clone, Default)]
struct PathRoot {
    namespace_id: Option<String>,
    is_team_space: bool,
}

/// Owns the account's credential-backed [`Session`] and the small set of
/// facts (namespace id, team-space flag) that must survive a restart.
///
/// The underlying session is created lazily on first use via
/// double-checked locking: most calls only need the fast read-lock path.
pub struct RemoteClient {
    account_id: String,
    base_url: Option<String>,
    retry: RetryConfig,
    credentials: Arc<dyn CredentialStore>,
    state: Arc<dyn StateStore>,
    session: RwLock<Option<Arc<Session>>>,
    path_root: RwLock<PathRoot>,
}

impl RemoteClient {
    /// Creates a client for `account_id` against the default base URL.
    /// The session is not created until the first call that needs it.
    pub fn new(
        account_id: impl Into<String>,
        credentials: Arc<dyn CredentialStore>,
        state: Arc<dyn StateStore>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            base_url: None,
            retry,
            credentials,
            state,
            session: RwLock::new(None),
            path_root: RwLock::new(PathRoot::default()),
        }
    }

    /// Creates a client against a custom base URL (used in tests).
    pub fn with_base_url(
        account_id: impl Into<String>,
        base_url: impl Into<String>,
        credentials: Arc<dyn CredentialStore>,
        state: Arc<dyn StateStore>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            base_url: Some(base_url.into()),
            retry,
            credentials,
            state,
            session: RwLock::new(None),
            path_root: RwLock::new(PathRoot::default()),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Returns the cached namespace id, if the account uses a non-default
    /// path root. `None` means requests are interpreted relative to the
    /// account's home namespace.
    pub async fn namespace_id(&self) -> Option<String> {
        self.path_root.read().await.namespace_id.clone()
    }

    /// Whether the linked account's root namespace is a Team Space.
    pub async fn is_team_space(&self) -> bool {
        self.path_root.read().await.is_team_space
    }

    /// Returns the live session, initializing it on first use from the
    /// stored credential and any previously persisted path root.
    pub async fn session(&self) -> Result<Arc<Session>, RemoteError> {
        if let Some(session) = self.session.read().await.clone() {
            return Ok(session);
        }

        let mut guard = self.session.write().await;
        if let Some(session) = guard.clone() {
            return Ok(session);
        }

        let credential = self
            .credentials
            .load(&self.account_id)
            .await
            .map_err(credential_error)?
            .ok_or(RemoteError::NotLinked)?;

        let session = Arc::new(match &self.base_url {
            Some(url) => {
                Session::with_base_url(credential.access_token, url.clone(), self.retry.clone())
            }
            None => Session::new(credential.access_token, self.retry.clone()),
        });

        if let Some(nsid) = self
            .state
            .get(STATE_SECTION, STATE_KEY_PATH_ROOT_NSID)
            .await
            .map_err(state_error)?
        {
            let is_team = self
                .state
                .get(STATE_SECTION, STATE_KEY_PATH_ROOT_TYPE)
                .await
                .map_err(state_error)?
                .as_deref()
                == Some("team");
            session.set_path_root(Some(nsid.clone())).await;
            *self.path_root.write().await = PathRoot {
                namespace_id: Some(nsid),
                is_team_space: is_team,
            };
        }

        *guard = Some(session.clone());
        debug!(account_id = %self.account_id, "remote session initialized");
        Ok(session)
    }

    /// Stores `credential` for this account and refreshes the cached path
    /// root against the server. Replaces any previously live session.
    pub async fn link(&self, credential: Credential) -> Result<(), RemoteError> {
        self.credentials
            .store(&self.account_id, &credential)
            .await
            .map_err(credential_error)?;
        *self.session.write().await = None;

        self.update_path_root(None).await
    }

    /// Revokes the token at the remote, then forgets the stored credential
    /// and live session for this account. A revocation failure is logged
    /// and otherwise ignored: the credential is deleted locally either way,
    /// since a token we can no longer use is useless to keep around.
    pub async fn unlink(&self) -> Result<(), RemoteError> {
        if let Ok(session) = self.session().await {
            if let Err(err) = revoke_token(&session).await {
                warn!(account_id = %self.account_id, error = %err, "token revocation failed, unlinking anyway");
            }
        }

        self.credentials
            .delete(&self.account_id)
            .await
            .map_err(credential_error)?;
        *self.session.write().await = None;
        *self.path_root.write().await = PathRoot::default();
        Ok(())
    }

    /// Refreshes the cached namespace id and team-space flag. Pass `None`
    /// to fetch the latest root info from the server; used after linking
    /// and whenever a call fails with a path-root mismatch.
    pub async fn update_path_root(&self, root_info: Option<RootInfo>) -> Result<(), RemoteError> {
        let session = self.session().await?;

        let (namespace_id, is_team_space) = match root_info {
            Some(RootInfo::Personal) => (None, false),
            Some(RootInfo::Namespace { namespace_id }) => (Some(namespace_id), true),
            None => {
                let info = fetch_account_info(&session).await?;
                (
                    Some(info.root_info.root_namespace_id().to_string()),
                    info.root_info.is_team(),
                )
            }
        };

        session.set_path_root(namespace_id.clone()).await;
        *self.path_root.write().await = PathRoot {
            namespace_id: namespace_id.clone(),
            is_team_space,
        };

        match &namespace_id {
            Some(nsid) => self
                .state
                .set(STATE_SECTION, STATE_KEY_PATH_ROOT_NSID, nsid)
                .await
                .map_err(state_error)?,
            None => self
                .state
                .clear(STATE_SECTION, STATE_KEY_PATH_ROOT_NSID)
                .await
                .map_err(state_error)?,
        }
        self.state
            .set(
                STATE_SECTION,
                STATE_KEY_PATH_ROOT_TYPE,
                if is_team_space { "team" } else { "user" },
            )
            .await
            .map_err(state_error)?;

        debug!(?namespace_id, is_team_space, "path root updated");
        Ok(())
    }

    /// Fetches the linked account's profile and quota usage. On the first
    /// call after linking (when no namespace id is cached yet), also
    /// adopts the account's home namespace as the path root.
    pub async fn get_user_info(&self) -> Result<UserInfo, RemoteError> {
        let session = self.session().await?;
        let info = fetch_account_info(&session).await?;

        self.state
            .set(STATE_SECTION, STATE_KEY_EMAIL, &info.email)
            .await
            .map_err(state_error)?;
        self.state
            .set(STATE_SECTION, STATE_KEY_DISPLAY_NAME, &info.display_name)
            .await
            .map_err(state_error)?;

        if self.path_root.read().await.namespace_id.is_none() {
            let home_nsid = info.root_info.home_namespace_id().to_string();
            session.set_path_root(Some(home_nsid.clone())).await;
            self.state
                .set(STATE_SECTION, STATE_KEY_PATH_ROOT_NSID, &home_nsid)
                .await
                .map_err(state_error)?;
            self.path_root.write().await.namespace_id = Some(home_nsid);
        }

        Ok(UserInfo {
            account_id: info.account_id,
            email: info.email,
            display_name: info.display_name,
            quota_used: info.quota_used,
            quota_total: info.quota_total,
        })
    }
}

async fn fetch_account_info(session: &Session) -> Result<AccountInfoResponse, RemoteError> {
    debug!("users_get_current_account");
    session
        .post_json(GET_CURRENT_ACCOUNT_PATH, &serde_json::json!({}))
        .await
}

/// Revokes the session's access token at the remote so it can no longer be
/// used if it leaks after being deleted locally.
async fn revoke_token(session: &Session) -> Result<(), RemoteError> {
    debug!("auth_token_revoke");
    session
        .post_json::<_, serde_json::Value>(TOKEN_REVOKE_PATH, &serde_json::json!({}))
        .await?;
    Ok(())
}

fn credential_error(err: CredentialStoreError) -> RemoteError {
    match err {
        CredentialStoreError::NotFound(_) => RemoteError::NotLinked,
        other => RemoteError::AuthError(other.to_string()),
    }
}

fn state_error(err: meridian_core::ports::StateStoreError) -> RemoteError {
    RemoteError::RemoteServerError(format!("state store error: {err}"))
}
