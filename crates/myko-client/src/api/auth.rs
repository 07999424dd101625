//! Authentication API.

use crate::auth::Token;
use crate::client::MykoClient;
use crate::error::{Error, Result};

/// Authentication API client.
pub struct AuthApi {
    client: MykoClient,
}

impl AuthApi {
    pub(crate) fn new(client: MykoClient) -> Self {
        Self { client }
    }

    fn authenticator(&self) -> Result<&crate::auth::Authenticator> {
        self.client
            .inner()
            .auth
            .as_ref()
            .ok_or_else(|| Error::Auth("no credentials configured".to_string()))
    }

    /// Whether the client was built with credentials.
    pub fn has_credentials(&self) -> bool {
        self.client.inner().auth.is_some()
    }

    /// Current bearer token, logging in or refreshing as needed.
    pub async fn token(&self) -> Result<Token> {
        let auth = self.authenticator()?;
        self.client.ensure_active()?;
        auth.token(self.client.executor()).await
    }

    /// Drop cached tokens and log in again.
    pub async fn login(&self) -> Result<Token> {
        let auth = self.authenticator()?;
        self.client.ensure_active()?;
        auth.clear().await;
        auth.token(self.client.executor()).await
    }

    /// Forget cached tokens.
    pub async fn logout(&self) -> Result<()> {
        self.authenticator()?.clear().await;
        Ok(())
    }
}
