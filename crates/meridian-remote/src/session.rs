//! HTTP transport for the remote's RPC-style API
//!
//! Wraps `reqwest::Client` with the authentication header, base URL, and
//! the account's path-root header, and provides the generic request
//! helpers the higher-level modules (`delta`, `transfer`, `batch`,
//! `metadata`) build their endpoint calls on top of.

use meridian_core::config::RetryConfig;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::errors::RemoteError;
use crate::retry::{parse_retry_after, RetryPolicy};

/// Default base URL for the remote API.
const DEFAULT_BASE_URL: &str = "https://api.meridiansync.dev/2";

/// Header the remote uses to scope requests to a non-default namespace,
/// analogous to Dropbox's `Dropbox-API-Path-Root` header.
const PATH_ROOT_HEADER: &str = "X-Remote-Path-Root";

/// Header carrying JSON call arguments alongside a binary request body.
const ARG_HEADER: &str = "X-Remote-Arg";

/// Authenticated HTTP client for the remote API.
pub struct Session {
    client: Client,
    base_url: String,
    access_token: RwLock<String>,
    path_root: RwLock<Option<String>>,
    retry: RetryPolicy,
}

impl Session {
    /// Creates a new session against the default base URL.
    pub fn new(access_token: impl Into<String>, retry: RetryConfig) -> Self {
        Self::with_base_url(access_token, DEFAULT_BASE_URL, retry)
    }

    /// Creates a new session against a custom base URL (used in tests).
    pub fn with_base_url(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
        retry: RetryConfig,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            access_token: RwLock::new(access_token.into()),
            path_root: RwLock::new(None),
            retry: RetryPolicy::new(retry.max_attempts),
        }
    }

    /// Replaces the access token, e.g. after a refresh.
    pub async fn set_access_token(&self, token: impl Into<String>) {
        let mut guard = self.access_token.write().await;
        *guard = token.into();
        debug!("session access token updated");
    }

    /// Sets the namespace/path-root header sent with every subsequent request.
    pub async fn set_path_root(&self, namespace_id: Option<String>) {
        let mut guard = self.path_root.write().await;
        *guard = namespace_id;
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let token = self.access_token.read().await;
        let mut builder = self.client.request(method, &url).bearer_auth(&*token);
        if let Some(ref ns) = *self.path_root.read().await {
            builder = builder.header(PATH_ROOT_HEADER, ns.clone());
        }
        builder
    }

    /// Sends a JSON POST request to `path` with `body`, retrying transient
    /// failures, and deserializes the JSON response as `R`.
    pub async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R, RemoteError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let response = self
            .retry
            .run(path, || async { self.send_json(Method::POST, path, body).await })
            .await?;
        parse_json(response).await
    }

    /// Sends a GET request to `path` and returns the raw response, retrying
    /// transient failures. Callers needing the body stream (downloads) read
    /// it from the returned [`Response`].
    pub async fn get_raw(&self, path: &str) -> Result<Response, RemoteError> {
        self.retry
            .run(path, || async { self.send(Method::GET, path).await })
            .await
    }

    /// Sends a JSON POST request and returns the raw response, retrying
    /// transient failures. Used for endpoints whose response body is not
    /// JSON (e.g. a file download, where metadata travels in a header).
    pub async fn post_json_raw<B>(&self, path: &str, body: &B) -> Result<Response, RemoteError>
    where
        B: Serialize + Sync,
    {
        self.retry
            .run(path, || async { self.send_json(Method::POST, path, body).await })
            .await
    }

    /// Sends a request with a raw binary body (uploads), retrying transient
    /// failures, and deserializes the JSON response as `R`. `arg_json` travels
    /// in the `X-Remote-Arg` header, analogous to Dropbox's
    /// `Dropbox-API-Arg` header on its content-bearing endpoints.
    pub async fn put_bytes<R>(
        &self,
        path: &str,
        arg_json: &str,
        data: Vec<u8>,
    ) -> Result<R, RemoteError>
    where
        R: DeserializeOwned,
    {
        let response = self
            .retry
            .run(path, || {
                let data = data.clone();
                async move {
                    let response = self
                        .request(Method::PUT, path)
                        .await
                        .header("Content-Type", "application/octet-stream")
                        .header(ARG_HEADER, arg_json)
                        .body(data)
                        .send()
                        .await
                        .map_err(RemoteError::NetworkError)?;
                    check_status(response).await
                }
            })
            .await?;
        parse_json(response).await
    }

    async fn send(&self, method: Method, path: &str) -> Result<Response, RemoteError> {
        let response = self
            .request(method, path)
            .await
            .send()
            .await
            .map_err(RemoteError::NetworkError)?;
        check_status(response).await
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<Response, RemoteError> {
        let response = self
            .request(method, path)
            .await
            .json(body)
            .send()
            .await
            .map_err(RemoteError::NetworkError)?;
        check_status(response).await
    }
}

/// Translates an HTTP status code into a [`RemoteError`], or passes the
/// response through unchanged on success. Retryable statuses (429, 5xx)
/// surface as errors the [`RetryPolicy`] recognizes and retries.
async fn check_status(response: Response) -> Result<Response, RemoteError> {
    match response.status() {
        StatusCode::OK | StatusCode::CREATED | StatusCode::ACCEPTED => Ok(response),
        StatusCode::UNAUTHORIZED => Err(RemoteError::AuthError(
            response.text().await.unwrap_or_default(),
        )),
        StatusCode::FORBIDDEN => {
            let body = response.text().await.unwrap_or_default();
            Err(forbidden_error(&body))
        }
        StatusCode::NOT_FOUND => Err(RemoteError::NotFoundError(
            response.text().await.unwrap_or_default(),
        )),
        StatusCode::CONFLICT => {
            let body = response.text().await.unwrap_or_default();
            Err(conflict_error(&body))
        }
        StatusCode::TOO_MANY_REQUESTS => {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .map(parse_retry_after);
            warn!(?retry_after, "received 429 too many requests");
            Err(RemoteError::RemoteServerError("too many requests".to_string()))
        }
        status if status.is_server_error() => Err(RemoteError::RemoteServerError(format!(
            "{status}: {}",
            response.text().await.unwrap_or_default()
        ))),
        status => Err(RemoteError::BadInputError(format!(
            "unexpected status {status}"
        ))),
    }
}

/// The `.tag`-discriminated shape of a remote error body, e.g.
/// `{"error_summary": "path/not_found/...", "error": {".tag": "path"}}`.
/// Only the nested tag is used for dispatch; `error_summary` is kept for the
/// fallback error message.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<ErrorTag>,
    #[serde(default)]
    error_summary: String,
}

#[derive(Debug, Deserialize)]
struct ErrorTag {
    #[serde(rename = ".tag")]
    tag: String,
}

fn parse_error_tag(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .map(|e| e.tag)
}

/// Maps a 403 body to the specific policy-denial variant its `.tag`
/// identifies, falling back to [`RemoteError::InsufficientPermissionsError`]
/// for anything else.
fn forbidden_error(body: &str) -> RemoteError {
    match parse_error_tag(body).as_deref() {
        Some("insufficient_space") => RemoteError::InsufficientSpaceError,
        Some("file_size") => RemoteError::FileSizeError(body.to_string()),
        Some("restricted_content") => RemoteError::RestrictedContentError(body.to_string()),
        _ => RemoteError::InsufficientPermissionsError(body.to_string()),
    }
}

/// Maps a 409 body to the specific sync-conflict variant its `.tag`
/// identifies, falling back to [`RemoteError::SyncError`] for anything else.
fn conflict_error(body: &str) -> RemoteError {
    match parse_error_tag(body).as_deref() {
        Some("path_root") => RemoteError::PathRootError(body.to_string()),
        Some("reset") | Some("cursor_reset") => RemoteError::CursorResetError(body.to_string()),
        _ => RemoteError::SyncError(body.to_string()),
    }
}

async fn parse_json<R: DeserializeOwned>(response: Response) -> Result<R, RemoteError> {
    response
        .json::<R>()
        .await
        .map_err(|e| RemoteError::RemoteServerError(format!("malformed response body: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retry_config() -> RetryConfig {
        RetryConfig { max_attempts: 1 }
    }

    #[test]
    fn new_session_uses_default_base_url() {
        let session = Session::new("token", retry_config());
        assert_eq!(session.base_url(), DEFAULT_BASE_URL);
    }

    #[test]
    fn with_base_url_overrides_default() {
        let session = Session::with_base_url("token", "http://localhost:1234", retry_config());
        assert_eq!(session.base_url(), "http://localhost:1234");
    }

    #[tokio::test]
    async fn set_access_token_replaces_token() {
        let session = Session::new("old", retry_config());
        session.set_access_token("new").await;
        let guard = session.access_token.read().await;
        assert_eq!(&*guard, "new");
    }

    #[test]
    fn forbidden_error_maps_known_tags() {
        assert!(matches!(
            forbidden_error(r#"{"error":{".tag":"insufficient_space"}}"#),
            RemoteError::InsufficientSpaceError
        ));
        assert!(matches!(
            forbidden_error(r#"{"error":{".tag":"file_size"}}"#),
            RemoteError::FileSizeError(_)
        ));
        assert!(matches!(
            forbidden_error(r#"{"error":{".tag":"restricted_content"}}"#),
            RemoteError::RestrictedContentError(_)
        ));
        assert!(matches!(
            forbidden_error(r#"{"error":{".tag":"some_other_reason"}}"#),
            RemoteError::InsufficientPermissionsError(_)
        ));
        assert!(matches!(
            forbidden_error("not json"),
            RemoteError::InsufficientPermissionsError(_)
        ));
    }

    #[test]
    fn conflict_error_maps_known_tags() {
        assert!(matches!(
            conflict_error(r#"{"error":{".tag":"path_root"}}"#),
            RemoteError::PathRootError(_)
        ));
        assert!(matches!(
            conflict_error(r#"{"error":{".tag":"reset"}}"#),
            RemoteError::CursorResetError(_)
        ));
        assert!(matches!(
            conflict_error(r#"{"error":{".tag":"path"}}"#),
            RemoteError::SyncError(_)
        ));
    }
}
