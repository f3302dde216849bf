//! OAuth2 PKCE authentication flow for the remote client
//!
//! Implements the Authorization Code flow with PKCE (RFC 7636) for
//! authenticating a native desktop application against the remote's
//! identity platform.
//!
//! ## Components
//!
//! - [`OAuth2Config`] - configuration for the OAuth2 flow (endpoints, scopes)
//! - [`Tokens`] - the access/refresh token pair this crate works with
//! - [`PKCEFlow`] - OAuth2 PKCE challenge/exchange logic
//! - [`LocalCallbackServer`] - minimal HTTP server for the OAuth redirect
//! - [`RemoteAuthAdapter`] - orchestrates the full authentication flow

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use meridian_core::ports::Credential;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, CsrfToken, EndpointNotSet,
    EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, RefreshToken, Scope,
    TokenResponse, TokenUrl,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Default redirect URI for the local callback server
const REDIRECT_URI: &str = "http://127.0.0.1:8484/callback";

/// Keyring service name for storing tokens
const KEYRING_SERVICE: &str = "meridian";

/// Default OAuth2 scopes requested on link
const DEFAULT_SCOPES: &[&str] = &["files.readwrite", "account.read", "offline_access"];

/// An access/refresh token pair returned by the authorization server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl Tokens {
    /// Whether the access token has already expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl From<Tokens> for Credential {
    fn from(tokens: Tokens) -> Self {
        Credential {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
        }
    }
}

/// Configuration for the OAuth2 PKCE authentication flow
#[derive(Debug, Clone)]
pub struct OAuth2Config {
    /// Application (client) ID registered with the authorization server
    pub app_id: String,
    /// Authorization endpoint
    pub auth_url: String,
    /// Token endpoint
    pub token_url: String,
    /// Redirect URI for receiving the authorization code
    pub redirect_uri: String,
    /// OAuth scopes to request
    pub scopes: Vec<String>,
}

impl OAuth2Config {
    /// Creates a new OAuth2Config pointed at the given endpoints.
    pub fn new(app_id: impl Into<String>, auth_url: impl Into<String>, token_url: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            auth_url: auth_url.into(),
            token_url: token_url.into(),
            redirect_uri: REDIRECT_URI.to_string(),
            scopes: DEFAULT_SCOPES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Creates a config with custom scopes
    pub fn with_scopes(mut self, scopes: Vec<String>) -> Self {
        self.scopes = scopes;
        self
    }

    /// Creates a config with a custom redirect URI
    pub fn with_redirect_uri(mut self, uri: impl Into<String>) -> Self {
        self.redirect_uri = uri.into();
        self
    }
}

/// Stores and retrieves OAuth tokens from the system keyring
///
/// Uses the `keyring` crate to store tokens securely in the OS credential
/// store (e.g., GNOME Keyring, KDE Wallet). Tokens are serialized as JSON
/// under service name `"meridian"` with the account's email as username.
pub struct KeyringTokenStorage;

impl KeyringTokenStorage {
    /// Stores tokens in the system keyring for the given account.
    pub fn store(username: &str, tokens: &Tokens) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        let json = serde_json::to_string(tokens).context("Failed to serialize tokens")?;

        entry
            .set_password(&json)
            .context("Failed to store tokens in keyring")?;

        debug!("Stored tokens in keyring for account: {}", username);
        Ok(())
    }

    /// Loads tokens from the system keyring for the given account.
    ///
    /// Returns `Some(Tokens)` if found and valid, `None` if not found.
    pub fn load(username: &str) -> Result<Option<Tokens>> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.get_password() {
            Ok(json) => {
                let tokens: Tokens = serde_json::from_str(&json)
                    .context("Failed to deserialize tokens from keyring")?;
                debug!("Loaded tokens from keyring for account: {}", username);
                Ok(Some(tokens))
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No tokens found in keyring for account: {}", username);
                Ok(None)
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to read from keyring")),
        }
    }

    /// Removes tokens from the system keyring for the given account.
    pub fn clear(username: &str) -> Result<()> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, username)
            .context("Failed to create keyring entry")?;

        match entry.delete_credential() {
            Ok(()) => {
                info!("Cleared tokens from keyring for account: {}", username);
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                debug!("No tokens to clear for account: {}", username);
                Ok(())
            }
            Err(e) => Err(anyhow::Error::new(e).context("Failed to delete from keyring")),
        }
    }
}

/// OAuth2 PKCE flow implementation using the `oauth2` crate
///
/// Handles generating authorization URLs with PKCE challenges,
/// exchanging authorization codes for tokens, and refreshing tokens.
pub struct PKCEFlow {
    client: BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>,
    scopes: Vec<String>,
}

impl PKCEFlow {
    /// Creates a new PKCEFlow with the given configuration
    pub fn new(config: &OAuth2Config) -> Result<Self> {
        let client = BasicClient::new(ClientId::new(config.app_id.clone()))
            .set_auth_uri(AuthUrl::new(config.auth_url.clone()).context("Invalid authorization URL")?)
            .set_token_uri(TokenUrl::new(config.token_url.clone()).context("Invalid token URL")?)
            .set_redirect_uri(
                RedirectUrl::new(config.redirect_uri.clone()).context("Invalid redirect URI")?,
            );

        Ok(Self {
            client,
            scopes: config.scopes.clone(),
        })
    }

    /// Generates an authorization URL with a PKCE challenge
    ///
    /// Returns a tuple of `(authorization_url, csrf_token, pkce_verifier)`.
    /// The `pkce_verifier` must be kept until the code exchange step.
    pub fn generate_auth_url(&self) -> (String, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let mut auth_request = self.client.authorize_url(CsrfToken::new_random);

        for scope in &self.scopes {
            auth_request = auth_request.add_scope(Scope::new(scope.clone()));
        }

        let (auth_url, csrf_token) = auth_request.set_pkce_challenge(pkce_challenge).url();

        debug!("Generated authorization URL");
        (auth_url.to_string(), csrf_token, pkce_verifier)
    }

    /// Exchanges an authorization code for OAuth tokens
    pub async fn exchange_code(
        &self,
        code: String,
        pkce_verifier: PkceCodeVerifier,
    ) -> Result<Tokens> {
        info!("Exchanging authorization code for tokens");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .context("Failed to exchange authorization code")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result.refresh_token().map(|t| t.secret().to_string()),
            expires_at,
        };

        info!("Successfully obtained OAuth tokens");
        Ok(tokens)
    }

    /// Refreshes an expired access token using a refresh token
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<Tokens> {
        info!("Refreshing access token");

        let http_client = reqwest::Client::new();
        let token_result = self
            .client
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(&http_client)
            .await
            .context("Failed to refresh token")?;

        let expires_at = token_result
            .expires_in()
            .map(|d| Utc::now() + Duration::seconds(d.as_secs() as i64))
            .unwrap_or_else(|| Utc::now() + Duration::hours(1));

        let tokens = Tokens {
            access_token: token_result.access_token().secret().to_string(),
            refresh_token: token_result
                .refresh_token()
                .map(|t| t.secret().to_string())
                .or_else(|| Some(refresh_token.to_string())),
            expires_at,
        };

        info!("Successfully refreshed access token");
        Ok(tokens)
    }
}

/// Minimal HTTP server that listens on localhost for the OAuth2 redirect callback.
///
/// Starts an HTTP server on `127.0.0.1:8484` that waits for the authorization
/// server to redirect the user's browser back with an authorization code.
/// Once the code is received, it responds with a success HTML page and
/// shuts down.
pub struct LocalCallbackServer;

/// Parameters extracted from the OAuth2 callback
#[derive(Debug)]
pub struct CallbackParams {
    /// The authorization code
    pub code: String,
    /// The CSRF state parameter
    pub state: String,
}

impl LocalCallbackServer {
    /// Starts the local callback server and waits for the OAuth redirect
    ///
    /// Returns the callback parameters (code and state) extracted from the
    /// redirect URL.
    pub async fn start() -> Result<CallbackParams> {
        use http_body_util::Full;
        use hyper::body::Bytes;
        use hyper::server::conn::http1;
        use hyper::service::service_fn;
        use hyper::{Request, Response, StatusCode};
        use hyper_util::rt::TokioIo;
        use tokio::net::TcpListener;
        use tokio::sync::oneshot;

        info!("Starting local OAuth callback server on 127.0.0.1:8484");

        let listener = TcpListener::bind("127.0.0.1:8484")
            .await
            .context("Failed to bind callback server to 127.0.0.1:8484")?;

        let (tx, rx) = oneshot::channel::<CallbackParams>();
        let tx = std::sync::Arc::new(tokio::sync::Mutex::new(Some(tx)));

        // Accept a single connection
        let (stream, _addr) = listener
            .accept()
            .await
            .context("Failed to accept connection on callback server")?;

        let io = TokioIo::new(stream);
        let tx_clone = tx.clone();

        let service = service_fn(move |req: Request<hyper::body::Incoming>| {
            let tx_inner = tx_clone.clone();
            async move {
                let uri = req.uri().to_string();
                debug!("Callback server received request: {}", uri);

                let params = parse_callback_params(&uri);

                match params {
                    Some(callback_params) => {
                        if let Some(sender) = tx_inner.lock().await.take() {
                            let _ = sender.send(callback_params);
                        }

                        let html = success_html();
                        Ok::<_, hyper::Error>(
                            Response::builder()
                                .status(StatusCode::OK)
                                .header("Content-Type", "text/html; charset=utf-8")
                                .body(Full::new(Bytes::from(html)))
                                .unwrap(),
                        )
                    }
                    None => {
                        let html = error_html("Missing authorization code in callback");
                        Ok(Response::builder()
                            .status(StatusCode::BAD_REQUEST)
                            .header("Content-Type", "text/html; charset=utf-8")
                            .body(Full::new(Bytes::from(html)))
                            .unwrap())
                    }
                }
            }
        });

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                warn!("Callback server connection error: {}", e);
            }
        });

        let params = rx
            .await
            .context("Callback server channel closed without receiving parameters")?;

        info!("Received OAuth callback with authorization code");
        Ok(params)
    }
}

/// Parses the authorization code and state from a callback URI
fn parse_callback_params(uri: &str) -> Option<CallbackParams> {
    let url = url::Url::parse(&format!("http://localhost{}", uri)).ok()?;
    let mut code = None;
    let mut state = None;

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.to_string()),
            "state" => state = Some(value.to_string()),
            _ => {}
        }
    }

    Some(CallbackParams {
        code: code?,
        state: state.unwrap_or_default(),
    })
}

fn success_html() -> String {
    r#"<!DOCTYPE html>
<html>
<head><title>Meridian - Authentication Successful</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Successful</h1>
    <p>Your account has been linked.</p>
    <p>You can close this window and return to Meridian.</p>
    <script>setTimeout(function() { window.close(); }, 3000);</script>
</body>
</html>"#
        .to_string()
}

fn error_html(message: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Meridian - Authentication Error</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 50px;">
    <h1>Authentication Error</h1>
    <p>{}</p>
    <p>Please close this window and try again.</p>
</body>
</html>"#,
        message
    )
}

/// High-level authentication adapter that orchestrates the full OAuth2 PKCE flow.
///
/// Combines [`PKCEFlow`], [`LocalCallbackServer`], and browser launching to
/// provide a complete interactive authentication experience:
///
/// 1. Generates a PKCE authorization URL
/// 2. Opens the user's browser to the authorization server's login page
/// 3. Starts a local callback server to receive the redirect
/// 4. Exchanges the authorization code for tokens
/// 5. Returns the tokens
pub struct RemoteAuthAdapter {
    config: OAuth2Config,
}

impl RemoteAuthAdapter {
    /// Creates a new adapter with the given configuration
    pub fn new(config: OAuth2Config) -> Self {
        Self { config }
    }

    /// Performs the full interactive OAuth2 PKCE login flow
    pub async fn login(&self) -> Result<Tokens> {
        info!("Starting OAuth2 PKCE login flow");

        let flow = PKCEFlow::new(&self.config)?;

        let (auth_url, _csrf_token, pkce_verifier) = flow.generate_auth_url();

        info!("Opening browser for authentication");
        webbrowser::open(&auth_url).context("Failed to open browser for authentication")?;

        let callback = LocalCallbackServer::start().await?;

        let tokens = flow.exchange_code(callback.code, pkce_verifier).await?;

        info!("OAuth2 PKCE login completed successfully");
        Ok(tokens)
    }

    /// Refreshes an expired access token
    pub async fn refresh(&self, refresh_token: &str) -> Result<Tokens> {
        let flow = PKCEFlow::new(&self.config)?;
        flow.refresh_token(refresh_token).await
    }

    /// Returns a reference to the current configuration
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }
}
