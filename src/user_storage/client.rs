//! HTTP client for the remote user storage service.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use super::models::{PutEntryBody, PutFeatureBody, StorageEntry, UserStorageFeature};
use super::trait_def::{StorageError, UserStorage};

/// Client for the per-feature collection endpoints of the user storage API.
///
/// - `GET|PUT|DELETE {base_url}/{feature}` addresses a whole collection
/// - `GET|PUT|DELETE {base_url}/{feature}/{hashed_key}` addresses one entry
#[derive(Clone)]
pub struct UserStorageClient {
    client: Client,
    base_url: String,
    bearer_token: Option<String>,
}

impl UserStorageClient {
    /// Create a new UserStorageClient.
    ///
    /// # Arguments
    /// * `base_url` - Base URL of the storage API (e.g., "https://user-storage.example/api/v1/userstorage")
    /// * `timeout_secs` - Request timeout in seconds
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self, StorageError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url,
            bearer_token: None,
        })
    }

    /// Attach a bearer token sent with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn feature_url(&self, feature: &UserStorageFeature) -> String {
        format!("{}/{}", self.base_url, feature)
    }

    fn entry_url(&self, feature: &UserStorageFeature, hashed_key: &str) -> String {
        format!("{}/{}/{}", self.base_url, feature, hashed_key)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn ensure_success(response: Response) -> Result<Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Status {
            status: status.as_u16(),
            body,
        })
    }

    /// Decode a GET body where `null`, an empty body and a 404 all mean absent.
    async fn read_nullable<T: DeserializeOwned>(
        response: Response,
    ) -> Result<Option<T>, StorageError> {
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::ensure_success(response).await?;
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str::<Option<T>>(&body)
            .map_err(|e| StorageError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl UserStorage for UserStorageClient {
    async fn get_entry(
        &self,
        feature: &UserStorageFeature,
        hashed_key: &str,
    ) -> Result<Option<StorageEntry>, StorageError> {
        let url = self.entry_url(feature, hashed_key);
        let response = self.authorized(self.client.get(&url)).send().await?;
        Self::read_nullable(response).await
    }

    async fn get_all(
        &self,
        feature: &UserStorageFeature,
    ) -> Result<Option<Vec<StorageEntry>>, StorageError> {
        let url = self.feature_url(feature);
        let response = self.authorized(self.client.get(&url)).send().await?;
        let entries: Option<Vec<StorageEntry>> = Self::read_nullable(response).await?;
        Ok(entries.filter(|e| !e.is_empty()))
    }

    async fn put(
        &self,
        feature: &UserStorageFeature,
        hashed_key: &str,
        data: &str,
    ) -> Result<(), StorageError> {
        let url = self.entry_url(feature, hashed_key);
        let body = PutEntryBody {
            data: data.to_string(),
        };
        let response = self
            .authorized(self.client.put(&url).json(&body))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        debug!(feature = %feature, "Stored user storage entry");
        Ok(())
    }

    async fn put_batch(
        &self,
        feature: &UserStorageFeature,
        entries: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }
        let url = self.feature_url(feature);
        let body = PutFeatureBody::Upsert {
            data: entries.clone(),
        };
        let response = self
            .authorized(self.client.put(&url).json(&body))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        debug!(feature = %feature, count = entries.len(), "Stored user storage batch");
        Ok(())
    }

    async fn put_batch_delete(
        &self,
        feature: &UserStorageFeature,
        hashed_keys: &[String],
    ) -> Result<(), StorageError> {
        if hashed_keys.is_empty() {
            return Ok(());
        }
        let url = self.feature_url(feature);
        let body = PutFeatureBody::BatchDelete {
            batch_delete: hashed_keys.to_vec(),
        };
        let response = self
            .authorized(self.client.put(&url).json(&body))
            .send()
            .await?;
        Self::ensure_success(response).await?;
        debug!(feature = %feature, count = hashed_keys.len(), "Batch deleted user storage entries");
        Ok(())
    }

    async fn delete_entry(
        &self,
        feature: &UserStorageFeature,
        hashed_key: &str,
    ) -> Result<(), StorageError> {
        let url = self.entry_url(feature, hashed_key);
        let response = self.authorized(self.client.delete(&url)).send().await?;
        // Deleting an absent entry is not an error
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn delete_all(&self, feature: &UserStorageFeature) -> Result<(), StorageError> {
        let url = self.feature_url(feature);
        let response = self.authorized(self.client.delete(&url)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::ensure_success(response).await?;
        debug!(feature = %feature, "Cleared user storage feature");
        Ok(())
    }
}
