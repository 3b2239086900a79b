//! Content source payload and the announcement shapes derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::debug;

// =========================================================================
// Content source payload
// =========================================================================

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContentPayload {
    /// Items that fail to decode are dropped one by one.
    #[serde(default, deserialize_with = "skip_malformed_items")]
    pub items: Vec<ContentItem>,
    #[serde(default)]
    pub includes: Option<ContentIncludes>,
}

fn skip_malformed_items<'de, D>(deserializer: D) -> Result<Vec<ContentItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<ContentItem>(item) {
            Ok(item) => Some(item),
            Err(e) => {
                debug!(error = %e, "Skipping malformed announcement item");
                None
            }
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContentSys {
    pub id: String,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Reference to an included entry or asset.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContentLink {
    pub sys: ContentSys,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementFields {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub short_description: String,
    /// Rich text document.
    #[serde(default)]
    pub long_description: serde_json::Value,
    #[serde(default)]
    pub image: Option<ContentLink>,
    #[serde(default)]
    pub extension_link: Option<ContentLink>,
    #[serde(default)]
    pub link: Option<ContentLink>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContentItem {
    pub sys: ContentSys,
    pub fields: AnnouncementFields,
}

/// Entry or asset pulled in by `include`. Fields stay untyped until resolved.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct IncludedItem {
    pub sys: ContentSys,
    #[serde(default)]
    pub fields: serde_json::Value,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ContentIncludes {
    #[serde(rename = "Entry", default)]
    pub entry: Vec<IncludedItem>,
    #[serde(rename = "Asset", default)]
    pub asset: Vec<IncludedItem>,
}

impl ContentIncludes {
    /// Fields of the included item with `id`, looking at entries first.
    pub fn find(&self, id: &str) -> Option<&serde_json::Value> {
        self.entry
            .iter()
            .chain(self.asset.iter())
            .find(|item| item.sys.id == id)
            .map(|item| &item.fields)
    }
}

// =========================================================================
// Resolved announcement
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementImage {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: String,
}

/// In-app route the announcement points to.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementAction {
    pub extension_link_text: String,
    pub extension_link_route: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementLink {
    pub link_text: String,
    pub link_url: String,
    #[serde(default)]
    pub is_external: bool,
}

/// Announcement with references resolved, long description still rich text.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAnnouncement {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub category: Option<String>,
    pub title: String,
    pub short_description: String,
    pub long_description: serde_json::Value,
    pub image: Option<AnnouncementImage>,
    pub extension_link: Option<AnnouncementAction>,
    pub link: Option<AnnouncementLink>,
}

/// Rendered announcement carried by a feature-announcement notification.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureAnnouncementData {
    pub id: String,
    pub category: Option<String>,
    pub title: String,
    pub short_description: String,
    /// Rendered HTML.
    pub long_description: String,
    pub image: Option<AnnouncementImage>,
    pub extension_link: Option<AnnouncementAction>,
    pub link: Option<AnnouncementLink>,
}
