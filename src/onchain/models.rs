//! Wire types for the trigger and notification backend.

use serde::{Deserialize, Serialize};

/// One element of the batch-create request body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerCreateRequest {
    pub id: String,
    pub chain_id: String,
    pub kind: String,
    pub address: String,
}

/// One element of the (optional) batch-create response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatedTrigger {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNotificationsRequest {
    pub trigger_ids: Vec<String>,
    pub page: u32,
    pub per_page: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkAsReadRequest {
    pub ids: Vec<String>,
}

/// Notification as returned by the notification API.
///
/// `data` is kept as raw JSON; only `data.kind` is interpreted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnChainRawNotification {
    pub id: String,
    pub trigger_id: String,
    pub chain_id: u64,
    pub block_number: u64,
    pub block_timestamp: String,
    pub tx_hash: String,
    pub unread: bool,
    pub created_at: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl OnChainRawNotification {
    /// Trigger kind of the event, taken from `type` or falling back to `data.kind`.
    pub fn kind(&self) -> Option<&str> {
        self.notification_type
            .as_deref()
            .or_else(|| self.data.get("kind").and_then(|k| k.as_str()))
    }
}
