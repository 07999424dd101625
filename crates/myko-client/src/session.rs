//! Transport session: the pooled HTTP connection resource.
//!
//! A [`Session`] owns one `reqwest::Client` (and therefore one connection
//! pool) between [`Session::open`] and [`Session::close`]. Concurrent
//! requests share the pool; a semaphore bounds how many are in flight, and
//! its permit is held by the sending future so that cancelling a request
//! gives the slot back.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::redirect::Policy;
use tokio::sync::Semaphore;
use url::Url;

use crate::error::{Error, Result};
use crate::request::{RequestBody, RequestDescriptor};
use crate::response::RawResponse;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default TCP connect timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of concurrent in-flight requests.
pub const DEFAULT_MAX_CONNECTIONS: usize = 16;

/// Anything that can turn a request descriptor into a raw response.
///
/// [`Session`] is the production implementation; tests substitute scripted
/// transports to drive the executor deterministically.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and read the full response.
    ///
    /// Must not interpret the status code: that is the executor's job.
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        (**self).send(request).await
    }
}

/// Static settings for a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL relative paths are joined onto. Always ends with `/`.
    pub base_url: Url,
    /// Headers sent with every request.
    pub default_headers: Vec<(String, String)>,
    /// Whole-request timeout (connect, send, and body read).
    pub timeout: Duration,
    /// TCP connect timeout.
    pub connect_timeout: Duration,
    /// Maximum concurrent in-flight requests.
    pub max_connections: usize,
    /// User agent string.
    pub user_agent: String,
}

impl SessionConfig {
    /// Create a config with defaults for everything but the base URL.
    pub fn new(base_url: &str) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(base_url)?,
            default_headers: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            user_agent: format!("myko-client/{}", env!("CARGO_PKG_VERSION")),
        })
    }
}

/// Parse a base URL and make sure relative joins keep its path.
pub(crate) fn normalize_base_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        url.set_path(&format!("{}/", url.path()));
    }
    Ok(url)
}

/// Live state of an open session.
struct OpenSession {
    http: reqwest::Client,
    slots: Arc<Semaphore>,
}

/// A long-lived pool of HTTP connections.
pub struct Session {
    config: SessionConfig,
    state: RwLock<Option<OpenSession>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("base_url", &self.config.base_url.as_str())
            .field("open", &self.is_open())
            .finish()
    }
}

impl Session {
    /// Create a closed session.
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            state: RwLock::new(None),
        }
    }

    /// Session settings.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Whether the connection pool is currently open.
    pub fn is_open(&self) -> bool {
        self.state.read().is_some()
    }

    /// Build the connection pool.
    ///
    /// Opening an already-open session is a no-op.
    pub fn open(&self) -> Result<()> {
        let mut state = self.state.write();
        if state.is_some() {
            tracing::debug!(base_url = %self.config.base_url, "Session already open");
            return Ok(());
        }

        if self.config.max_connections == 0 {
            return Err(Error::Config(
                "max_connections must be greater than 0".to_string(),
            ));
        }

        let mut headers = HeaderMap::new();
        for (name, value) in &self.config.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| Error::Config(format!("Invalid header name: {}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| Error::Config(format!("Invalid value for header {}", name)))?;
            headers.insert(name, value);
        }

        // Redirects are surfaced to callers; the login flow reads the 302 itself.
        // Cookies live as long as the pool, which ties the identity provider's
        // authorize page to the credential POST that follows it.
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .user_agent(&self.config.user_agent)
            .timeout(self.config.timeout)
            .connect_timeout(self.config.connect_timeout)
            .pool_max_idle_per_host(self.config.max_connections)
            .redirect(Policy::none())
            .build()?;

        *state = Some(OpenSession {
            http,
            slots: Arc::new(Semaphore::new(self.config.max_connections)),
        });

        tracing::info!(
            base_url = %self.config.base_url,
            max_connections = self.config.max_connections,
            "Session opened"
        );
        Ok(())
    }

    /// Release the connection pool.
    ///
    /// Safe to call on a session that was never opened, and more than once.
    /// Requests waiting for a slot fail with [`Error::SessionClosed`];
    /// requests already in flight finish on their own clone of the pool.
    pub fn close(&self) {
        if let Some(open) = self.state.write().take() {
            open.slots.close();
            tracing::info!(base_url = %self.config.base_url, "Session closed");
        }
    }

    /// Resolve a descriptor path against the base URL.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        if path.starts_with("http://") || path.starts_with("https://") {
            return Ok(Url::parse(path)?);
        }
        Ok(self.config.base_url.join(path.trim_start_matches('/'))?)
    }

    fn handle(&self) -> Result<(reqwest::Client, Arc<Semaphore>)> {
        let state = self.state.read();
        let open = state.as_ref().ok_or(Error::SessionClosed)?;
        Ok((open.http.clone(), Arc::clone(&open.slots)))
    }
}

#[async_trait]
impl Transport for Session {
    async fn send(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        let (http, slots) = self.handle()?;
        let url = self.resolve(request.path())?;

        // Held until this future completes or is dropped.
        let _permit = slots
            .acquire_owned()
            .await
            .map_err(|_| Error::SessionClosed)?;

        let mut builder = http.request(request.method().clone(), url.clone());
        if !request.query().is_empty() {
            builder = builder.query(request.query());
        }
        for (name, value) in request.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body() {
            Some(RequestBody::Json(value)) => builder.json(value),
            Some(RequestBody::Form(fields)) => builder.form(fields),
            Some(RequestBody::Bytes { content_type, data }) => builder
                .header(reqwest::header::CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
            None => builder,
        };

        tracing::debug!(method = %request.method(), url = %url, "Sending request");
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        tracing::debug!(url = %url, status, bytes = body.len(), "Received response");

        Ok(RawResponse::new(status, headers, body))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(SessionConfig::new("http://localhost:8080/v1").unwrap())
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = SessionConfig::new("http://localhost:8080/v1").unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/v1/");
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let session = session();
        assert_eq!(
            session.resolve("/users/me").unwrap().as_str(),
            "http://localhost:8080/v1/users/me"
        );
        assert_eq!(
            session.resolve("https://other.example/token").unwrap().as_str(),
            "https://other.example/token"
        );
    }

    #[test]
    fn test_open_is_idempotent() {
        let session = session();
        assert!(!session.is_open());
        session.open().unwrap();
        session.open().unwrap();
        assert!(session.is_open());
    }

    #[test]
    fn test_close_twice_is_noop() {
        let session = session();
        session.open().unwrap();
        session.close();
        session.close();
        assert!(!session.is_open());
    }

    #[test]
    fn test_close_without_open() {
        let session = session();
        session.close();
        assert!(!session.is_open());
    }

    #[test]
    fn test_zero_connections_rejected() {
        let mut config = SessionConfig::new("http://localhost").unwrap();
        config.max_connections = 0;
        let session = Session::new(config);
        assert!(matches!(session.open(), Err(Error::Config(_))));
        assert!(!session.is_open());
    }

    #[test]
    fn test_invalid_default_header_rejected() {
        let mut config = SessionConfig::new("http://localhost").unwrap();
        config
            .default_headers
            .push(("bad header".to_string(), "x".to_string()));
        let session = Session::new(config);
        assert!(matches!(session.open(), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_send_on_closed_session() {
        let session = session();
        let request = RequestDescriptor::get("users/me").build();
        let err = session.send(&request).await.unwrap_err();
        assert!(matches!(err, Error::SessionClosed));
    }
}
