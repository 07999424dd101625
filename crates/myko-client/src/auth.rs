//! Login flow and token management.
//!
//! The Myko identity provider is a Keycloak realm driven the way the mobile
//! app drives it:
//!
//! 1. GET the OpenID authorize page with a PKCE challenge and scrape the
//!    login form out of the returned HTML.
//! 2. POST the credentials to the form action. The provider answers with a
//!    302 whose `Location` carries an authorization code.
//! 3. Exchange the code (plus PKCE verifier) for a refresh token.
//! 4. Exchange the refresh token for a short-lived ID token, used as the
//!    bearer token against the data API.

use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::html::{ElementQuery, HtmlDocument};
use crate::request::RequestDescriptor;
use crate::response::RawResponse;

/// Default client ID registered with the identity provider.
pub const DEFAULT_CLIENT_ID: &str = "hubspace_android";

/// Default redirect URI for the authorization code.
pub const DEFAULT_REDIRECT_URI: &str = "hubspace-app://loginredirect";

/// Default OpenID authorize endpoint.
pub const DEFAULT_OPENID_URL: &str =
    "https://accounts.hubspaceconnect.com/auth/realms/thd/protocol/openid-connect/auth";

/// Default login form action endpoint.
pub const DEFAULT_CODE_URL: &str =
    "https://accounts.hubspaceconnect.com/auth/realms/thd/login-actions/authenticate";

/// Default token endpoint.
pub const DEFAULT_TOKEN_URL: &str =
    "https://accounts.hubspaceconnect.com/auth/realms/thd/protocol/openid-connect/token";

/// ID tokens are valid for two minutes; refresh slightly early.
pub const DEFAULT_TOKEN_LIFETIME: Duration = Duration::from_secs(118);

/// HTML id of the login form on the authorize page.
const LOGIN_FORM_ID: &str = "kc-form-login";

const LOGIN_SCOPE: &str = "openid offline_access";
const REFRESH_SCOPE: &str = "openid email offline_access profile";

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthConfig {
    /// OAuth client ID.
    pub client_id: String,
    /// Redirect URI registered for the client.
    pub redirect_uri: String,
    /// OpenID authorize endpoint.
    pub openid_url: String,
    /// Login form action endpoint.
    pub code_url: String,
    /// Token endpoint.
    pub token_url: String,
    /// How long an ID token is trusted after issue.
    pub token_lifetime: Duration,
    /// User agent sent to the identity provider, if it differs from the session's.
    pub user_agent: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            redirect_uri: DEFAULT_REDIRECT_URI.to_string(),
            openid_url: DEFAULT_OPENID_URL.to_string(),
            code_url: DEFAULT_CODE_URL.to_string(),
            token_url: DEFAULT_TOKEN_URL.to_string(),
            token_lifetime: DEFAULT_TOKEN_LIFETIME,
            user_agent: Some("Dart/2.18 (dart:io)".to_string()),
        }
    }
}

/// Username and password.
#[derive(Clone)]
pub struct Credentials {
    /// Account username (email).
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Create credentials.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// PKCE code verifier and challenge pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge {
    /// Secret verifier, sent with the code exchange.
    pub verifier: String,
    /// SHA-256 of the verifier, sent with the authorize request.
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair.
    pub fn generate() -> Self {
        let mut verifier_bytes = [0u8; 40];
        rand::rng().fill_bytes(&mut verifier_bytes);
        let verifier: String = URL_SAFE_NO_PAD
            .encode(verifier_bytes)
            .chars()
            .filter(char::is_ascii_alphanumeric)
            .collect();
        Self::from_verifier(verifier)
    }

    /// Derive the challenge for a known verifier.
    pub fn from_verifier(verifier: impl Into<String>) -> Self {
        let verifier = verifier.into();
        let digest = Sha256::digest(verifier.as_bytes());
        Self {
            challenge: URL_SAFE_NO_PAD.encode(digest),
            verifier,
        }
    }
}

/// Identifiers scraped from the login form action URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSession {
    /// Keycloak session code.
    pub session_code: String,
    /// Keycloak execution ID.
    pub execution: String,
    /// Keycloak tab ID.
    pub tab_id: String,
}

/// Pull the form action parameters out of the authorize page.
pub fn extract_login_data(page: &str) -> Result<LoginSession> {
    let document = HtmlDocument::parse(page);
    let form = document
        .find_by_id(LOGIN_FORM_ID)
        .ok_or_else(|| Error::MalformedResponse("Unable to parse login page".to_string()))?;
    let action = form
        .attr("action")
        .ok_or_else(|| Error::MalformedResponse("Unable to extract login url".to_string()))?;

    let malformed = || Error::MalformedResponse("Unable to parse login url".to_string());
    let url = Url::parse(action).map_err(|_| malformed())?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    Ok(LoginSession {
        session_code: param("session_code").ok_or_else(malformed)?,
        execution: param("execution").ok_or_else(malformed)?,
        tab_id: param("tab_id").ok_or_else(malformed)?,
    })
}

/// A bearer token with its local expiry.
#[derive(Debug, Clone)]
pub struct Token {
    value: String,
    expires_at: Instant,
}

impl Token {
    /// Wrap a token that expires after `lifetime`.
    pub fn new(value: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            value: value.into(),
            expires_at: Instant::now() + lifetime,
        }
    }

    /// The raw token string.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Whether the token is past its expiry.
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    /// Time left before expiry, zero once expired.
    pub fn expires_in(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }
}

#[derive(Debug, Default)]
struct AuthState {
    refresh_token: Option<String>,
    token: Option<Token>,
}

/// Runs the login flow and caches tokens.
///
/// The cache is guarded by an async mutex, so concurrent callers of
/// [`Authenticator::token`] share a single login or refresh.
#[derive(Debug)]
pub struct Authenticator {
    config: AuthConfig,
    credentials: Credentials,
    state: Mutex<AuthState>,
}

impl Authenticator {
    /// Create an authenticator with no cached tokens.
    pub fn new(config: AuthConfig, credentials: Credentials) -> Self {
        Self {
            config,
            credentials,
            state: Mutex::new(AuthState::default()),
        }
    }

    /// Identity provider settings.
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    /// Username being authenticated.
    pub fn username(&self) -> &str {
        &self.credentials.username
    }

    /// Seed a refresh token obtained earlier, skipping the initial login.
    pub async fn set_refresh_token(&self, refresh_token: impl Into<String>) {
        let mut state = self.state.lock().await;
        state.refresh_token = Some(refresh_token.into());
        state.token = None;
    }

    /// Current refresh token, if a login has happened.
    pub async fn refresh_token(&self) -> Option<String> {
        self.state.lock().await.refresh_token.clone()
    }

    /// Whether there is no usable cached token.
    pub async fn is_expired(&self) -> bool {
        self.state
            .lock()
            .await
            .token
            .as_ref()
            .is_none_or(Token::is_expired)
    }

    /// Drop all cached tokens.
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        state.refresh_token = None;
        state.token = None;
    }

    /// Return a valid ID token, logging in or refreshing as needed.
    pub async fn token(&self, executor: &Executor) -> Result<Token> {
        let mut state = self.state.lock().await;
        if let Some(token) = state.token.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.clone());
        }

        let refresh_token = match state.refresh_token.clone() {
            Some(token) => token,
            None => {
                let token = self.perform_initial_login(executor).await?;
                state.refresh_token = Some(token.clone());
                token
            }
        };

        match self.generate_token(&refresh_token, executor).await {
            Ok(token) => {
                state.token = Some(token.clone());
                Ok(token)
            }
            Err(e) => {
                if e.is_auth_error() || matches!(e.status(), Some(400)) {
                    // The refresh token was revoked; the next call logs in again.
                    tracing::warn!(error = %e, "Refresh token rejected, clearing");
                    state.refresh_token = None;
                }
                Err(e)
            }
        }
    }

    /// Run the full login and return a refresh token.
    pub async fn perform_initial_login(&self, executor: &Executor) -> Result<String> {
        tracing::info!(username = %self.credentials.username, "Performing initial login");
        let challenge = PkceChallenge::generate();
        let code = self.webapp_login(&challenge, executor).await?;
        self.generate_refresh_token(&code, &challenge, executor)
            .await
    }

    /// Load the authorize page and submit the credentials, returning the code.
    pub async fn webapp_login(
        &self,
        challenge: &PkceChallenge,
        executor: &Executor,
    ) -> Result<String> {
        let request = self
            .request(RequestDescriptor::get(&self.config.openid_url))
            .query_pairs([
                ("response_type", "code"),
                ("client_id", self.config.client_id.as_str()),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code_challenge", challenge.challenge.as_str()),
                ("code_challenge_method", "S256"),
                ("scope", LOGIN_SCOPE),
            ])
            .build();

        let response = executor.execute(&request).await?;
        if response.status != 200 {
            return Err(Error::HttpStatus {
                status: response.status,
                body: response.text(),
            });
        }

        let login = extract_login_data(&response.text())?;
        tracing::debug!(tab_id = %login.tab_id, "Extracted login form");
        self.generate_code(&login, executor).await
    }

    /// Submit credentials to the login form and read the code from the redirect.
    pub async fn generate_code(&self, login: &LoginSession, executor: &Executor) -> Result<String> {
        let request = self
            .request(RequestDescriptor::post(&self.config.code_url))
            .query_pairs([
                ("session_code", login.session_code.as_str()),
                ("execution", login.execution.as_str()),
                ("client_id", self.config.client_id.as_str()),
                ("tab_id", login.tab_id.as_str()),
            ])
            .form([
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
                ("credentialId", ""),
            ])
            .accept_status(302)
            .build();

        let response = executor.execute(&request).await?;
        if response.status != 302 {
            return Err(Error::MalformedResponse(format!(
                "Unexpected status {} from login form",
                response.status
            )));
        }

        response
            .location()
            .and_then(|location| Url::parse(location).ok())
            .and_then(|url| {
                url.query_pairs()
                    .find(|(k, _)| k == "code")
                    .map(|(_, v)| v.into_owned())
            })
            .ok_or_else(|| {
                Error::Auth("Unable to authenticate with the supplied username / password".into())
            })
    }

    /// Exchange an authorization code for a refresh token.
    pub async fn generate_refresh_token(
        &self,
        code: &str,
        challenge: &PkceChallenge,
        executor: &Executor,
    ) -> Result<String> {
        let request = self
            .request(RequestDescriptor::post(&self.config.token_url))
            .form([
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code_verifier", challenge.verifier.as_str()),
                ("client_id", self.config.client_id.as_str()),
            ])
            .build();

        let response = executor.execute(&request).await?;
        json_string_field(&response, "refresh_token")
    }

    /// Exchange a refresh token for an ID token.
    pub async fn generate_token(&self, refresh_token: &str, executor: &Executor) -> Result<Token> {
        let request = self
            .request(RequestDescriptor::post(&self.config.token_url))
            .form([
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
                ("scope", REFRESH_SCOPE),
                ("client_id", self.config.client_id.as_str()),
            ])
            .build();

        let response = executor.execute(&request).await?;
        let id_token = json_string_field(&response, "id_token")?;
        tracing::debug!(
            lifetime_secs = self.config.token_lifetime.as_secs(),
            "Obtained ID token"
        );
        Ok(Token::new(id_token, self.config.token_lifetime))
    }

    fn request(&self, builder: crate::request::RequestBuilder) -> crate::request::RequestBuilder {
        match &self.config.user_agent {
            Some(agent) => builder.header("User-Agent", agent.as_str()),
            None => builder,
        }
    }
}

/// Read a string field from a JSON token response.
fn json_string_field(response: &RawResponse, field: &str) -> Result<String> {
    let value: Value = serde_json::from_slice(&response.body)
        .map_err(|e| Error::MalformedResponse(format!("invalid token response: {}", e)))?;
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MalformedResponse(format!("token response missing {}", field)))
}
