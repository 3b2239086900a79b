//! Normalization of raw notifications into [`Notification`].

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use tracing::debug;

use super::models::{Notification, NotificationData, OnChainNotificationData};
use crate::onchain::OnChainRawNotification;
use crate::triggers::TriggerKind;

/// Normalize one on-chain notification.
///
/// `None` for unknown trigger kinds and unparseable timestamps.
pub fn process_on_chain_notification(
    raw: OnChainRawNotification,
    read_ids: &IndexSet<String>,
) -> Option<Notification> {
    let kind = match raw.kind().map(str::parse::<TriggerKind>) {
        Some(Ok(kind)) => kind,
        _ => {
            debug!(id = %raw.id, kind = ?raw.kind(), "Dropping notification of unknown kind");
            return None;
        }
    };
    let created_at = match DateTime::parse_from_rfc3339(&raw.created_at) {
        Ok(ts) => ts.with_timezone(&Utc),
        Err(e) => {
            debug!(id = %raw.id, error = %e, "Dropping notification with invalid timestamp");
            return None;
        }
    };

    let is_read = !raw.unread || read_ids.contains(&raw.id);
    Some(Notification {
        id: raw.id,
        notification_type: kind.as_str().to_string(),
        created_at,
        is_read,
        data: NotificationData::OnChain(OnChainNotificationData {
            trigger_id: raw.trigger_id,
            chain_id: raw.chain_id,
            block_number: raw.block_number,
            block_timestamp: raw.block_timestamp,
            tx_hash: raw.tx_hash,
            data: raw.data,
        }),
    })
}

/// Flag notifications already read locally.
pub fn apply_read_ids(mut notification: Notification, read_ids: &IndexSet<String>) -> Notification {
    if read_ids.contains(&notification.id) {
        notification.is_read = true;
    }
    notification
}

/// Newest first. Ties keep their relative order.
pub fn sort_newest_first(notifications: &mut [Notification]) {
    notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}
