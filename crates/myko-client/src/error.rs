//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// DNS resolution or TCP connect failed.
    #[error("Connection error: {0}")]
    Connection(String),

    /// TLS handshake or certificate validation failed.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Server answered with a status outside the accepted set.
    #[error("HTTP status {status}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Response body, lossily decoded.
        body: String,
    },

    /// Response body could not be normalized into the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Every attempt failed with a retryable error.
    #[error("Retries exhausted after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of send attempts made.
        attempts: u32,
        /// The error from the final attempt.
        last: Box<Error>,
    },

    /// Login or token exchange was rejected.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// The session was used while closed.
    #[error("Session is not open")]
    SessionClosed,

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Any other HTTP layer failure (body decode, redirect loop, builder).
    #[error("HTTP error: {0}")]
    Http(String),
}

impl Error {
    /// Whether the executor may retry after this error.
    ///
    /// Only transient transport failures qualify. Status-based retries are
    /// decided by the retry policy, which knows the retryable status set.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection(_) | Error::Timeout(_))
    }

    /// HTTP status carried by this error, looking through retry exhaustion.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::HttpStatus { status, .. } => Some(*status),
            Error::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::Auth(_)) || matches!(self.status(), Some(401 | 403))
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self.status(), Some(status) if status >= 500)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Error::Timeout(err.to_string());
        }
        let chain = source_chain(&err);
        if looks_like_tls(&chain) {
            return Error::Tls(chain);
        }
        if err.is_connect() {
            return Error::Connection(chain);
        }
        if err.is_builder() {
            return Error::Config(chain);
        }
        Error::Http(chain)
    }
}

/// Flatten an error and its sources into one line.
fn source_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

// reqwest does not expose a TLS predicate, the rustls messages are stable enough.
fn looks_like_tls(chain: &str) -> bool {
    let lower = chain.to_ascii_lowercase();
    ["certificate", "tls", "handshake", "invalidcertificate"]
        .iter()
        .any(|needle| lower.contains(needle))
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
