//! Feature announcement fetching with retries and graceful degradation.

use reqwest::Client;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error};

use super::mapping::map_to_notifications;
use super::models::ContentPayload;
use super::render::{render, HtmlRenderer, RichTextRenderer};
use super::retry::{RetryOutcome, RetryPolicy};
use crate::notifications::Notification;

pub const DEFAULT_CONTENT_BASE_URL: &str = "https://cdn.contentful.com";
pub const DEFAULT_ENVIRONMENT: &str = "master";

/// Errors of a single fetch attempt.
#[derive(Debug, Error)]
pub enum AnnouncementFetchError {
    #[error("Content request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Fetch failed with status: {0}")]
    Status(u16),

    #[error("Invalid content payload: {0}")]
    Decode(String),
}

/// Where announcements are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementSource {
    pub space_id: String,
    pub access_token: String,
    pub environment: String,
    pub base_url: String,
}

impl AnnouncementSource {
    pub fn new(space_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            space_id: space_id.into(),
            access_token: access_token.into(),
            environment: DEFAULT_ENVIRONMENT.to_string(),
            base_url: DEFAULT_CONTENT_BASE_URL.to_string(),
        }
    }

    /// Entries endpoint, without query.
    pub fn entries_url(&self) -> String {
        format!(
            "{}/spaces/{}/environments/{}/entries",
            self.base_url.trim_end_matches('/'),
            self.space_id,
            self.environment,
        )
    }

    /// Query selecting extension product announcements.
    ///
    /// Carries the access token; do not log it.
    pub fn entries_query(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("access_token", self.access_token.as_str()),
            ("content_type", "productAnnouncement"),
            ("include", "10"),
            ("fields.clients", "extension"),
        ]
    }
}

pub struct FeatureAnnouncementFetcher {
    client: Client,
    source: Option<AnnouncementSource>,
    retry: RetryPolicy,
    renderer: Arc<dyn RichTextRenderer>,
}

impl FeatureAnnouncementFetcher {
    /// Without a source the fetcher yields no announcements and makes no requests.
    pub fn new(source: Option<AnnouncementSource>, retry: RetryPolicy) -> Result<Self, AnnouncementFetchError> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            source,
            retry,
            renderer: Arc::new(HtmlRenderer),
        })
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn RichTextRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.source.is_some()
    }

    /// Errors never carry the URL, whose query may hold the access token.
    async fn fetch_once(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<ContentPayload, AnnouncementFetchError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| AnnouncementFetchError::Request(e.without_url()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnnouncementFetchError::Status(status.as_u16()));
        }
        response
            .json::<ContentPayload>()
            .await
            .map_err(|e| AnnouncementFetchError::Decode(e.without_url().to_string()))
    }

    /// GET `url` with `query` and retries. `None` once every attempt has failed.
    pub async fn fetch(&self, url: &str, query: &[(&str, &str)]) -> Option<ContentPayload> {
        match self.retry.run(|| self.fetch_once(url, query)).await {
            RetryOutcome::Success { value, attempts } => {
                debug!(attempts, items = value.items.len(), "Fetched feature announcements");
                Some(value)
            }
            RetryOutcome::Exhausted { last_error, attempts } => {
                error!(attempts, error = %last_error, "Fetching feature announcements failed");
                None
            }
        }
    }

    /// Fetch, resolve and render all announcements.
    pub async fn get_feature_announcement_notifications(&self) -> Vec<Notification> {
        let Some(source) = &self.source else {
            return Vec::new();
        };
        let payload = self
            .fetch(&source.entries_url(), &source.entries_query())
            .await;
        map_to_notifications(payload.as_ref())
            .into_iter()
            .map(|raw| render(raw, self.renderer.as_ref()))
            .collect()
    }
}
