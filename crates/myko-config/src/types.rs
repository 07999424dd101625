//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [client]
//! base_url = "https://api2.afero.net/v1"
//! timeout_secs = 30
//!
//! [retry]
//! max_attempts = 3
//!
//! [auth]
//! username = "me@example.com"
//! password_env = "MYKO_PASSWORD"
//! ```
//!
//! Every section and key is optional; missing values take the defaults
//! below.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

/// Default data API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api2.afero.net/v1";

/// Environment variable consulted for the password when `password_env` is unset.
pub const DEFAULT_PASSWORD_ENV: &str = "MYKO_PASSWORD";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MykoConfig {
    /// Connection settings.
    pub client: ClientSection,
    /// Retry and backoff settings.
    pub retry: RetrySection,
    /// Login settings.
    pub auth: AuthSection,
}

impl MykoConfig {
    /// Create a config with every value defaulted.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section for values the client would reject.
    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.retry.validate()?;
        self.auth.validate()
    }

    /// Warnings about risky but valid settings.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.auth.password.is_some() {
            warnings.push(format!(
                "[auth] contains a plaintext password. \
                 Consider setting {} instead.",
                self.auth.password_env_name()
            ));
        }
        warnings
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [client]
// ─────────────────────────────────────────────────────────────────────────────

/// Connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSection {
    /// Data API base URL.
    pub base_url: String,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Maximum concurrent in-flight requests.
    pub max_connections: usize,
    /// Custom user agent for data API requests.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ClientSection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_connections: 16,
            user_agent: None,
        }
    }
}

impl ClientSection {
    /// Request timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout as a duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::invalid("client.base_url", "must not be empty"));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "client.timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::invalid(
                "client.connect_timeout_secs",
                "must be greater than 0",
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::invalid(
                "client.max_connections",
                "must be greater than 0",
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [retry]
// ─────────────────────────────────────────────────────────────────────────────

/// Retry and backoff settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, in milliseconds.
    pub base_delay_ms: u64,
    /// Backoff multiplier.
    pub factor: f64,
    /// Cap on a single delay, in milliseconds.
    pub max_delay_ms: u64,
    /// Statuses retried instead of surfaced.
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetrySection {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            factor: 2.0,
            max_delay_ms: 5_000,
            retryable_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl RetrySection {
    /// Base delay as a duration.
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    /// Maximum delay as a duration.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "retry.max_attempts",
                "must be greater than 0",
            ));
        }
        if !(self.factor >= 1.0) {
            return Err(ConfigError::invalid("retry.factor", "must be at least 1.0"));
        }
        if let Some(status) = self
            .retryable_statuses
            .iter()
            .find(|s| !(100..=599).contains(*s))
        {
            return Err(ConfigError::invalid(
                "retry.retryable_statuses",
                format!("{} is not an HTTP status", status),
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// [auth]
// ─────────────────────────────────────────────────────────────────────────────

/// Login settings. Unset endpoint values use the client library's defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// Account username (email).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Plaintext password. Prefer `password_env`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Environment variable holding the password.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
    /// OAuth client ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    /// OAuth redirect URI.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,
    /// OpenID authorize endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openid_url: Option<String>,
    /// Login form endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_url: Option<String>,
    /// Token endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
}

impl AuthSection {
    /// Name of the environment variable consulted for the password.
    pub fn password_env_name(&self) -> &str {
        self.password_env.as_deref().unwrap_or(DEFAULT_PASSWORD_ENV)
    }

    /// Resolve the password from the file, then the process environment.
    pub fn resolve_password(&self) -> Option<String> {
        self.resolve_password_with(|name| std::env::var(name).ok())
    }

    /// Resolve the password using a custom environment lookup.
    pub fn resolve_password_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(password) = &self.password {
            return Some(password.clone());
        }
        lookup(self.password_env_name()).filter(|p| !p.is_empty())
    }

    fn validate(&self) -> Result<()> {
        let urls = [
            ("auth.openid_url", &self.openid_url),
            ("auth.code_url", &self.code_url),
            ("auth.token_url", &self.token_url),
            ("auth.redirect_uri", &self.redirect_uri),
        ];
        for (field, value) in urls {
            if let Some(value) = value
                && value.trim().is_empty()
            {
                return Err(ConfigError::invalid(field, "must not be empty"));
            }
        }
        if let Some(username) = &self.username
            && username.trim().is_empty()
        {
            return Err(ConfigError::invalid("auth.username", "must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = MykoConfig::from_toml("").unwrap();
        assert_eq!(config, MykoConfig::default());
        assert_eq!(config.client.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.client.timeout(), Duration::from_secs(30));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.retryable_statuses, vec![429, 500, 502, 503, 504]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config = MykoConfig::from_toml(
            r#"
[client]
timeout_secs = 5

[retry]
max_attempts = 7
factor = 1.5

[auth]
username = "me@example.com"
"#,
        )
        .unwrap();

        assert_eq!(config.client.timeout_secs, 5);
        assert_eq!(config.client.max_connections, 16);
        assert_eq!(config.retry.max_attempts, 7);
        assert_eq!(config.retry.factor, 1.5);
        assert_eq!(config.retry.base_delay(), Duration::from_millis(200));
        assert_eq!(config.auth.username.as_deref(), Some("me@example.com"));
        assert!(config.auth.token_url.is_none());
    }

    #[test]
    fn test_to_toml_round_trip() {
        let mut config = MykoConfig::new();
        config.client.base_url = "http://localhost:9000/v1".to_string();
        config.auth.username = Some("me".to_string());
        config.retry.retryable_statuses = vec![503];

        let text = config.to_toml().unwrap();
        assert!(text.contains("[client]"));
        assert!(!text.contains("password"));
        assert_eq!(MykoConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases = [
            ("[client]\nbase_url = \"\"", "client.base_url"),
            ("[client]\ntimeout_secs = 0", "client.timeout_secs"),
            ("[client]\nmax_connections = 0", "client.max_connections"),
            ("[retry]\nmax_attempts = 0", "retry.max_attempts"),
            ("[retry]\nfactor = 0.5", "retry.factor"),
            ("[retry]\nretryable_statuses = [42]", "retry.retryable_statuses"),
            ("[auth]\ntoken_url = \" \"", "auth.token_url"),
            ("[auth]\nusername = \"\"", "auth.username"),
        ];
        for (toml, expected) in cases {
            let config = MykoConfig::from_toml(toml).unwrap();
            match config.validate() {
                Err(ConfigError::Invalid { field, .. }) => assert_eq!(field, expected),
                other => panic!("{toml:?}: expected Invalid, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_unknown_type_is_parse_error() {
        let err = MykoConfig::from_toml("[retry]\nmax_attempts = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_password_resolution_order() {
        let env = |name: &str| (name == "MYKO_PASSWORD").then(|| "from-env".to_string());

        let mut auth = AuthSection::default();
        assert_eq!(auth.resolve_password_with(env).as_deref(), Some("from-env"));

        auth.password_env = Some("OTHER_VAR".to_string());
        assert_eq!(auth.resolve_password_with(env), None);

        auth.password = Some("from-file".to_string());
        assert_eq!(auth.resolve_password_with(env).as_deref(), Some("from-file"));
    }

    #[test]
    fn test_empty_env_password_ignored() {
        let auth = AuthSection::default();
        assert_eq!(auth.resolve_password_with(|_| Some(String::new())), None);
    }

    #[test]
    fn test_plaintext_password_warning() {
        let mut config = MykoConfig::new();
        assert!(config.warnings().is_empty());

        config.auth.password = Some("secret".to_string());
        let warnings = config.warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("plaintext"));
        assert!(warnings[0].contains("MYKO_PASSWORD"));
    }
}
