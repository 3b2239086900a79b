//! Backend trigger and notification API.

mod client;
mod models;

#[cfg(any(test, feature = "mock"))]
pub use client::MockTriggerApi;
pub use client::{
    TriggerApi, TriggerApiClient, TriggerApiError, NOTIFICATIONS_MAX_PAGES,
    NOTIFICATIONS_PAGE_SIZE,
};
pub use models::{
    CreatedTrigger, ListNotificationsRequest, MarkAsReadRequest, OnChainRawNotification,
    TriggerCreateRequest,
};
