//! Main client implementation.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OnceCell;

use crate::api::{AccountApi, AuthApi, DevicesApi};
use crate::auth::{AuthConfig, Authenticator, Credentials};
use crate::error::{Error, Result};
use crate::executor::{Executor, RetryPolicy};
use crate::html::HtmlDocument;
use crate::normalize::{Normalized, normalize};
use crate::request::{RequestBuilder, RequestDescriptor};
use crate::response::RawResponse;
use crate::session::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_CONNECTIONS, DEFAULT_TIMEOUT, Session, SessionConfig,
    Transport,
};

/// Default data API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api2.afero.net/v1";

/// Myko API client.
///
/// Cloning is cheap; clones share one session, one token cache, and one
/// "active" flag. Requests only succeed while the client is active:
///
/// ```no_run
/// use myko_client::{MykoClient, Result};
///
/// # async fn example() -> Result<()> {
/// let client = MykoClient::builder()
///     .credentials("user@example.com", "secret")
///     .build()?;
///
/// let devices = client
///     .scoped(|client| async move { client.devices().list().await })
///     .await?;
/// println!("{} devices", devices.len());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MykoClient {
    inner: Arc<ClientInner>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    /// Connection pool.
    pub(crate) session: Arc<Session>,
    /// Retrying executor over `transport`.
    pub(crate) executor: Executor,
    /// Login flow and token cache, when credentials were supplied.
    pub(crate) auth: Option<Authenticator>,
    /// Account ID, resolved on first use.
    pub(crate) account_id: OnceCell<String>,
    /// Whether an [`ActiveClient`] guard currently exists.
    active: AtomicBool,
}

impl std::fmt::Debug for MykoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MykoClient")
            .field("session", &self.inner.session)
            .field("authenticated", &self.inner.auth.is_some())
            .finish()
    }
}

impl MykoClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Get access to the inner client state (for API implementations).
    pub(crate) fn inner(&self) -> &ClientInner {
        &self.inner
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &url::Url {
        &self.inner.session.config().base_url
    }

    /// The retrying executor backing every request.
    pub fn executor(&self) -> &Executor {
        &self.inner.executor
    }

    /// Whether the session is currently open.
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::SeqCst)
    }

    pub(crate) fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::SessionClosed)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Session lifetime
    // ─────────────────────────────────────────────────────────────────────────

    /// Open the session and return a guard that closes it on drop.
    ///
    /// Only one guard may exist at a time; a second call while active
    /// fails with [`Error::Config`] and leaves the open session untouched.
    pub fn activate(&self) -> Result<ActiveClient> {
        if self
            .inner
            .active
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(Error::Config("client is already active".to_string()));
        }

        if let Err(e) = self.inner.session.open() {
            self.inner.active.store(false, Ordering::SeqCst);
            return Err(e);
        }

        Ok(ActiveClient {
            client: self.clone(),
        })
    }

    /// Run `f` with the session open, closing it however `f` ends.
    pub async fn scoped<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(MykoClient) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let guard = self.activate()?;
        let result = f(self.clone()).await;
        guard.deactivate();
        result
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the account API.
    pub fn account(&self) -> AccountApi {
        AccountApi::new(self.clone())
    }

    /// Access the devices API.
    pub fn devices(&self) -> DevicesApi {
        DevicesApi::new(self.clone())
    }

    /// Access the authentication API.
    pub fn auth(&self) -> AuthApi {
        AuthApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Generic operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Send a descriptor through the executor and return the raw response.
    ///
    /// Fails with [`Error::SessionClosed`] unless the client is active,
    /// whichever transport it was built with.
    pub async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        self.ensure_active()?;
        self.inner.executor.execute(request).await
    }

    /// Send a descriptor and normalize the response body.
    pub async fn fetch(&self, request: &RequestDescriptor) -> Result<Normalized> {
        let response = self.send(request).await?;
        normalize(response)
    }

    /// GET a path as JSON, with the bearer token attached when available.
    pub async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let builder = RequestDescriptor::get(path).query_pairs(query.iter().copied());
        let request = self.authorized(builder).await?.build();
        self.fetch(&request).await?.into_json()
    }

    /// GET a path as an HTML document.
    pub async fn get_html(&self, path: &str) -> Result<HtmlDocument> {
        let request = self.authorized(RequestDescriptor::get(path)).await?.build();
        self.fetch(&request).await?.into_html()
    }

    /// Attach the bearer token if this client has credentials.
    pub async fn authorized(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        self.ensure_active()?;
        match &self.inner.auth {
            Some(auth) => {
                let token = auth.token(&self.inner.executor).await?;
                Ok(builder.bearer(token.value()))
            }
            None => Ok(builder),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Make an authorized GET request and deserialize the JSON response.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let builder = RequestDescriptor::get(path).query_pairs(query.iter().copied());
        let request = self.authorized(builder).await?.build();
        self.fetch(&request).await?.deserialize()
    }

    /// Make an authorized PUT request with a JSON body.
    ///
    /// The response body is not read as JSON; a success status is enough.
    pub(crate) async fn put<B>(&self, path: &str, body: &B) -> Result<RawResponse>
    where
        B: Serialize + ?Sized,
    {
        let builder = RequestDescriptor::put(path).json(body)?;
        let request = self.authorized(builder).await?.build();
        self.send(&request).await
    }
}

/// Guard for an open session.
///
/// Dereferences to [`MykoClient`]; dropping it closes the session exactly
/// once, including when the owning future is cancelled or panics.
#[derive(Debug)]
pub struct ActiveClient {
    client: MykoClient,
}

impl ActiveClient {
    /// Close the session now.
    pub fn deactivate(self) {}

    /// A handle to share with concurrent tasks.
    pub fn client(&self) -> MykoClient {
        self.client.clone()
    }
}

impl std::ops::Deref for ActiveClient {
    type Target = MykoClient;

    fn deref(&self) -> &MykoClient {
        &self.client
    }
}

impl Drop for ActiveClient {
    fn drop(&mut self) {
        self.client.inner.session.close();
        self.client.inner.active.store(false, Ordering::SeqCst);
    }
}

/// Builder for creating a MykoClient.
pub struct ClientBuilder {
    base_url: Option<String>,
    timeout: Duration,
    connect_timeout: Duration,
    max_connections: usize,
    user_agent: Option<String>,
    default_headers: Vec<(String, String)>,
    retry: RetryPolicy,
    credentials: Option<Credentials>,
    auth_config: AuthConfig,
    transport: Option<Arc<dyn Transport>>,
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("max_connections", &self.max_connections)
            .field("retry", &self.retry)
            .field("credentials", &self.credentials)
            .field("custom_transport", &self.transport.is_some())
            .finish_non_exhaustive()
    }
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            user_agent: None,
            default_headers: Vec::new(),
            retry: RetryPolicy::default(),
            credentials: None,
            auth_config: AuthConfig::default(),
            transport: None,
        }
    }

    /// Set the data API base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the TCP connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the maximum number of concurrent in-flight requests.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Add a header sent with every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    /// Set the retry policy.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Log in with a username and password.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::new(username, password));
        self
    }

    /// Override identity provider settings.
    pub fn auth_config(mut self, config: AuthConfig) -> Self {
        self.auth_config = config;
        self
    }

    /// Route requests through a custom transport instead of the HTTP session.
    ///
    /// The session is still opened and closed with the client, but carries no
    /// traffic. Intended for tests.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<MykoClient> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be greater than 0".to_string()));
        }
        if self.max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be greater than 0".to_string(),
            ));
        }
        self.retry.validate()?;

        let mut session_config = SessionConfig::new(&base_url)?;
        session_config.timeout = self.timeout;
        session_config.connect_timeout = self.connect_timeout;
        session_config.max_connections = self.max_connections;
        session_config.default_headers = self.default_headers;
        if let Some(agent) = self.user_agent {
            session_config.user_agent = agent;
        }

        let session = Arc::new(Session::new(session_config));
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => session.clone(),
        };

        Ok(MykoClient {
            inner: Arc::new(ClientInner {
                session,
                executor: Executor::new(transport, self.retry),
                auth: self
                    .credentials
                    .map(|creds| Authenticator::new(self.auth_config, creds)),
                account_id: OnceCell::new(),
                active: AtomicBool::new(false),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
