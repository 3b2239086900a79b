//! Trigger and notification backend client.

use async_trait::async_trait;
use reqwest::{Client, Response};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use super::models::{
    CreatedTrigger, ListNotificationsRequest, MarkAsReadRequest, OnChainRawNotification,
    TriggerCreateRequest,
};

/// Notifications requested per page.
pub const NOTIFICATIONS_PAGE_SIZE: u32 = 100;
/// Upper bound on pages fetched by one list call.
pub const NOTIFICATIONS_MAX_PAGES: u32 = 2;

#[derive(Debug, Error)]
pub enum TriggerApiError {
    #[error("Trigger API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Trigger API responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid trigger API response: {0}")]
    InvalidResponse(String),
}

/// Server-side trigger subscriptions and the notifications they produce.
///
/// Every call is authorized by the caller's bearer token.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait TriggerApi: Send + Sync {
    /// Create triggers in one request. Returns the ids the backend created.
    async fn batch_create(
        &self,
        auth_token: &str,
        triggers: &[TriggerCreateRequest],
    ) -> Result<Vec<String>, TriggerApiError>;

    async fn batch_delete(&self, auth_token: &str, trigger_ids: &[String])
        -> Result<(), TriggerApiError>;

    /// Notifications produced by the given triggers.
    async fn list_notifications(
        &self,
        auth_token: &str,
        trigger_ids: &[String],
    ) -> Result<Vec<OnChainRawNotification>, TriggerApiError>;

    async fn mark_notifications_as_read(
        &self,
        auth_token: &str,
        notification_ids: &[String],
    ) -> Result<(), TriggerApiError>;
}

/// reqwest implementation of [`TriggerApi`].
///
/// Triggers and notifications are served by two separate base URLs.
#[derive(Clone)]
pub struct TriggerApiClient {
    client: Client,
    trigger_api_url: String,
    notification_api_url: String,
}

impl TriggerApiClient {
    pub fn new(
        trigger_api_url: impl Into<String>,
        notification_api_url: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, TriggerApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;

        Ok(Self {
            client,
            trigger_api_url: trigger_api_url.into().trim_end_matches('/').to_string(),
            notification_api_url: notification_api_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn batch_url(&self) -> String {
        format!("{}/api/v1/triggers/batch", self.trigger_api_url)
    }

    fn notifications_url(&self) -> String {
        format!("{}/api/v1/notifications", self.notification_api_url)
    }

    fn mark_as_read_url(&self) -> String {
        format!("{}/api/v1/notifications/mark-as-read", self.notification_api_url)
    }

    async fn ensure_success(response: Response) -> Result<Response, TriggerApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(TriggerApiError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch_page(
        &self,
        auth_token: &str,
        trigger_ids: &[String],
        page: u32,
    ) -> Result<Vec<OnChainRawNotification>, TriggerApiError> {
        let body = ListNotificationsRequest {
            trigger_ids: trigger_ids.to_vec(),
            page,
            per_page: NOTIFICATIONS_PAGE_SIZE,
        };
        let response = self
            .client
            .post(self.notifications_url())
            .bearer_auth(auth_token)
            .json(&body)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        response
            .json::<Vec<OnChainRawNotification>>()
            .await
            .map_err(|e| TriggerApiError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TriggerApi for TriggerApiClient {
    async fn batch_create(
        &self,
        auth_token: &str,
        triggers: &[TriggerCreateRequest],
    ) -> Result<Vec<String>, TriggerApiError> {
        let response = self
            .client
            .post(self.batch_url())
            .bearer_auth(auth_token)
            .json(triggers)
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;

        // The backend may answer with an empty body; then every requested id was created
        let body = response.text().await?;
        let created = if body.trim().is_empty() {
            None
        } else {
            serde_json::from_str::<Option<Vec<CreatedTrigger>>>(&body)
                .map_err(|e| TriggerApiError::InvalidResponse(e.to_string()))?
        };
        let ids: Vec<String> = match created {
            Some(created) => created.into_iter().map(|t| t.id).collect(),
            None => triggers.iter().map(|t| t.id.clone()).collect(),
        };

        debug!(requested = triggers.len(), created = ids.len(), "Created triggers");
        Ok(ids)
    }

    async fn batch_delete(
        &self,
        auth_token: &str,
        trigger_ids: &[String],
    ) -> Result<(), TriggerApiError> {
        let response = self
            .client
            .delete(self.batch_url())
            .bearer_auth(auth_token)
            .json(trigger_ids)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        debug!(count = trigger_ids.len(), "Deleted triggers");
        Ok(())
    }

    async fn list_notifications(
        &self,
        auth_token: &str,
        trigger_ids: &[String],
    ) -> Result<Vec<OnChainRawNotification>, TriggerApiError> {
        let mut notifications = Vec::new();
        for page in 1..=NOTIFICATIONS_MAX_PAGES {
            let batch = self.fetch_page(auth_token, trigger_ids, page).await?;
            let last_page = batch.len() < NOTIFICATIONS_PAGE_SIZE as usize;
            notifications.extend(batch);
            if last_page {
                break;
            }
        }
        debug!(count = notifications.len(), "Fetched on-chain notifications");
        Ok(notifications)
    }

    async fn mark_notifications_as_read(
        &self,
        auth_token: &str,
        notification_ids: &[String],
    ) -> Result<(), TriggerApiError> {
        let body = MarkAsReadRequest {
            ids: notification_ids.to_vec(),
        };
        let response = self
            .client
            .post(self.mark_as_read_url())
            .bearer_auth(auth_token)
            .json(&body)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }
}
