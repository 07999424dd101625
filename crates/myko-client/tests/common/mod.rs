//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use myko_client::{AuthConfig, MykoClient, RetryPolicy};
use wiremock::MockServer;

/// Retry policy with millisecond backoff so tests run against real time.
pub fn fast_retry(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        base_delay: Duration::from_millis(1),
        factor: 1.0,
        max_delay: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

/// Data API base URL on the mock server.
pub fn data_url(server: &MockServer) -> String {
    format!("{}/v1", server.uri())
}

/// Anonymous client pointed at the mock server.
pub fn client(server: &MockServer, max_attempts: u32) -> MykoClient {
    MykoClient::builder()
        .base_url(data_url(server))
        .retry_policy(fast_retry(max_attempts))
        .build()
        .expect("client should build")
}

/// Identity provider endpoints on the mock server.
pub fn auth_config(server: &MockServer) -> AuthConfig {
    AuthConfig {
        openid_url: format!("{}/auth/openid", server.uri()),
        code_url: format!("{}/auth/code", server.uri()),
        token_url: format!("{}/auth/token", server.uri()),
        ..AuthConfig::default()
    }
}

/// Authorize page whose login form points back at the mock server.
pub fn login_page(server: &MockServer) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
  <head><title>Sign in</title></head>
  <body>
    <form id="kc-form-login" method="post"
          action="{}/auth/code?session_code=sess-1&amp;execution=exec-1&amp;client_id=hubspace_android&amp;tab_id=tab-1">
      <input id="username" name="username" type="text">
      <input id="password" name="password" type="password">
    </form>
  </body>
</html>"#,
        server.uri()
    )
}
