//! CLI command handlers.

pub mod account;
pub mod config;
pub mod devices;
pub mod get;
pub mod login;
pub mod states;

use std::path::PathBuf;

use myko_client::{AuthConfig, Error, MykoClient, RetryPolicy};
use myko_config::MykoConfig;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Effective configuration (file values with CLI overrides applied).
    pub config: MykoConfig,
    /// Config file location, whether or not it exists.
    pub config_path: Option<PathBuf>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Build a client, logging in only if a username is configured.
    pub fn client(&self) -> Result<MykoClient, Error> {
        self.build_client(false)
    }

    /// Build a client that must log in.
    pub fn authenticated_client(&self) -> Result<MykoClient, Error> {
        self.build_client(true)
    }

    fn build_client(&self, require_credentials: bool) -> Result<MykoClient, Error> {
        let client = &self.config.client;
        let retry = &self.config.retry;
        let auth = &self.config.auth;

        let mut builder = MykoClient::builder()
            .base_url(&client.base_url)
            .timeout(client.timeout())
            .connect_timeout(client.connect_timeout())
            .max_connections(client.max_connections)
            .retry_policy(RetryPolicy {
                max_attempts: retry.max_attempts,
                base_delay: retry.base_delay(),
                factor: retry.factor,
                max_delay: retry.max_delay(),
                retryable_statuses: retry.retryable_statuses.clone(),
            })
            .auth_config(auth_config(&self.config));
        if let Some(agent) = &client.user_agent {
            builder = builder.user_agent(agent);
        }

        match &auth.username {
            Some(username) => {
                let password = auth.resolve_password().ok_or_else(|| {
                    Error::Auth(format!(
                        "no password for {}; set {} or [auth] password",
                        username,
                        auth.password_env_name()
                    ))
                })?;
                builder = builder.credentials(username, password);
            }
            None if require_credentials => {
                return Err(Error::Auth(
                    "no username configured; pass --username or set [auth] username".to_string(),
                ));
            }
            None => {}
        }

        builder.build()
    }
}

/// Identity provider settings, defaulting anything the config leaves unset.
fn auth_config(config: &MykoConfig) -> AuthConfig {
    let auth = &config.auth;
    let mut out = AuthConfig::default();
    if let Some(v) = &auth.client_id {
        out.client_id = v.clone();
    }
    if let Some(v) = &auth.redirect_uri {
        out.redirect_uri = v.clone();
    }
    if let Some(v) = &auth.openid_url {
        out.openid_url = v.clone();
    }
    if let Some(v) = &auth.code_url {
        out.code_url = v.clone();
    }
    if let Some(v) = &auth.token_url {
        out.token_url = v.clone();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(config: MykoConfig) -> Context {
        Context {
            config,
            config_path: None,
            json_output: false,
            verbose: false,
        }
    }

    #[test]
    fn test_anonymous_client_without_username() {
        let ctx = context(MykoConfig::default());
        let client = ctx.client().unwrap();
        assert!(!client.auth().has_credentials());
        assert!(matches!(ctx.authenticated_client(), Err(Error::Auth(_))));
    }

    #[test]
    fn test_username_requires_password() {
        let mut config = MykoConfig::default();
        config.auth.username = Some("me".to_string());
        config.auth.password_env = Some("MYKO_TEST_UNSET_PASSWORD_VAR".to_string());
        assert!(matches!(context(config).client(), Err(Error::Auth(_))));
    }

    #[test]
    fn test_config_values_reach_client() {
        let mut config = MykoConfig::default();
        config.client.base_url = "http://localhost:9000/v1".to_string();
        config.retry.max_attempts = 9;
        config.auth.username = Some("me".to_string());
        config.auth.password = Some("pw".to_string());

        let client = context(config).authenticated_client().unwrap();
        assert_eq!(client.base_url().as_str(), "http://localhost:9000/v1/");
        assert_eq!(client.executor().policy().max_attempts, 9);
        assert!(client.auth().has_credentials());
    }

    #[test]
    fn test_auth_overrides() {
        let mut config = MykoConfig::default();
        config.auth.token_url = Some("http://localhost/token".to_string());
        let auth = auth_config(&config);
        assert_eq!(auth.token_url, "http://localhost/token");
        assert_eq!(auth.client_id, AuthConfig::default().client_id);
    }
}
