use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Endpoints (can override CLI)
    pub user_storage_url: Option<String>,
    pub trigger_api_url: Option<String>,
    pub notification_api_url: Option<String>,
    pub request_timeout_sec: Option<u64>,

    // Feature configs
    pub announcements: Option<AnnouncementsConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct AnnouncementsConfig {
    pub space_id: Option<String>,
    pub access_token: Option<String>,
    pub environment: Option<String>,
    pub base_url: Option<String>,
    pub retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub attempt_timeout_sec: Option<u64>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}
