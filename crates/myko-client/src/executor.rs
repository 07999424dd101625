//! Request executor with exponential backoff retry.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::request::RequestDescriptor;
use crate::response::RawResponse;
use crate::session::Transport;

/// Statuses retried by default: rate limiting and transient server errors.
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry and backoff settings.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total send attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Multiplier applied to the delay after each attempt.
    pub factor: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Response statuses that are retried instead of surfaced.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
            factor: 2.0,
            max_delay: Duration::from_secs(5),
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl RetryPolicy {
    /// A policy that sends exactly once.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let nanos = self.base_delay.as_nanos() as f64 * self.factor.powi(exponent);
        if !nanos.is_finite() || nanos >= self.max_delay.as_nanos() as f64 {
            return self.max_delay;
        }
        Duration::from_nanos(nanos.max(0.0).round() as u64)
    }

    /// Whether a failure may be retried under this policy.
    pub fn is_retryable(&self, error: &Error) -> bool {
        match error {
            Error::HttpStatus { status, .. } => self.retryable_statuses.contains(status),
            other => other.is_retryable(),
        }
    }

    /// Check the policy for values that would make retrying meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(Error::Config(
                "max_attempts must be greater than 0".to_string(),
            ));
        }
        if !(self.factor >= 1.0) {
            return Err(Error::Config("backoff factor must be >= 1.0".to_string()));
        }
        Ok(())
    }
}

/// Sends descriptors through a transport, retrying transient failures.
#[derive(Clone)]
pub struct Executor {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Executor {
    /// Create an executor over a transport.
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// The active retry policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Send a request, retrying according to the policy.
    ///
    /// Responses whose status the descriptor accepts are returned as-is.
    /// Other statuses become [`Error::HttpStatus`]; those in the policy's
    /// retryable set are retried like transport failures. When every
    /// attempt fails retryably the last error is wrapped in
    /// [`Error::RetriesExhausted`].
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let error = match self.attempt(request).await {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            if !self.policy.is_retryable(&error) {
                tracing::debug!(
                    path = request.path(),
                    attempt,
                    error = %error,
                    "Request failed with non-retryable error"
                );
                return Err(error);
            }

            if attempt >= max_attempts {
                tracing::warn!(
                    path = request.path(),
                    attempts = attempt,
                    error = %error,
                    "Retries exhausted"
                );
                return Err(Error::RetriesExhausted {
                    attempts: attempt,
                    last: Box::new(error),
                });
            }

            let backoff = self.policy.delay_for(attempt);
            tracing::warn!(
                path = request.path(),
                attempt,
                max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                error = %error,
                "Request failed, retrying"
            );
            tokio::time::sleep(backoff).await;
        }
    }

    async fn attempt(&self, request: &RequestDescriptor) -> Result<RawResponse> {
        let response = self.transport.send(request).await?;
        if request.accepts(response.status) {
            Ok(response)
        } else {
            Err(Error::HttpStatus {
                status: response.status,
                body: response.text(),
            })
        }
    }
}
