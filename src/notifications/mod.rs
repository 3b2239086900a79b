//! Merged notification feed and session state.

mod auth;
mod models;
mod processing;
mod service;

pub use auth::{AuthProvider, StaticAuth};
pub use models::{
    MarkAsReadRequest, Notification, NotificationData, OnChainNotificationData,
    FEATURES_ANNOUNCEMENT,
};
pub use processing::{apply_read_ids, process_on_chain_notification, sort_newest_first};
pub use service::{NotificationsError, NotificationsService, NotificationsState};
