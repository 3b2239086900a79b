//! Credentials for the trigger backend and user storage.

use async_trait::async_trait;

/// Supplies the bearer token and the storage key of the signed-in user.
///
/// `None` means the credential is not available right now.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn bearer_token(&self) -> Option<String>;
    async fn storage_key(&self) -> Option<String>;
}

/// Fixed credentials, typically from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticAuth {
    bearer_token: Option<String>,
    storage_key: Option<String>,
}

impl StaticAuth {
    pub fn new(bearer_token: Option<String>, storage_key: Option<String>) -> Self {
        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
        Self {
            bearer_token: non_empty(bearer_token),
            storage_key: non_empty(storage_key),
        }
    }
}

#[async_trait]
impl AuthProvider for StaticAuth {
    async fn bearer_token(&self) -> Option<String> {
        self.bearer_token.clone()
    }

    async fn storage_key(&self) -> Option<String> {
        self.storage_key.clone()
    }
}
