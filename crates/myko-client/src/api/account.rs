//! Account API.

use crate::client::MykoClient;
use crate::error::{Error, Result};
use crate::types::UserInfo;

/// Account API client.
pub struct AccountApi {
    client: MykoClient,
}

impl AccountApi {
    pub(crate) fn new(client: MykoClient) -> Self {
        Self { client }
    }

    /// Get the logged-in user's profile.
    pub async fn me(&self) -> Result<UserInfo> {
        self.client.get("users/me", &[]).await
    }

    /// Get the account ID, fetching it on first call.
    pub async fn id(&self) -> Result<String> {
        let id = self
            .client
            .inner()
            .account_id
            .get_or_try_init(|| async {
                let info = self.me().await?;
                let account = info.account_access.into_iter().next().ok_or_else(|| {
                    Error::MalformedResponse("users/me returned no account access".to_string())
                })?;
                tracing::debug!(account_id = %account.account.account_id, "Resolved account");
                Ok::<_, Error>(account.account.account_id)
            })
            .await?;
        Ok(id.clone())
    }
}
