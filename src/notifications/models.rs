use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::announcements::FeatureAnnouncementData;

/// Notification type of content-source announcements. On-chain notifications
/// use their trigger kind as type.
pub const FEATURES_ANNOUNCEMENT: &str = "features_announcement";

/// Normalized notification, whatever its source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub created_at: DateTime<Utc>,
    pub is_read: bool,
    pub data: NotificationData,
}

impl Notification {
    pub fn is_feature_announcement(&self) -> bool {
        self.notification_type == FEATURES_ANNOUNCEMENT
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationData {
    OnChain(OnChainNotificationData),
    FeatureAnnouncement(FeatureAnnouncementData),
}

/// Event details of an on-chain notification. `data` is the backend payload as is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnChainNotificationData {
    pub trigger_id: String,
    pub chain_id: u64,
    pub block_number: u64,
    pub block_timestamp: String,
    pub tx_hash: String,
    pub data: serde_json::Value,
}

/// What mark-as-read needs to know about a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: String,
    pub is_read: bool,
}

impl From<&Notification> for MarkAsReadRequest {
    fn from(notification: &Notification) -> Self {
        Self {
            id: notification.id.clone(),
            notification_type: notification.notification_type.clone(),
            is_read: notification.is_read,
        }
    }
}
