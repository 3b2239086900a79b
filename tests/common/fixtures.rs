//! Shared constants and builders wired against a [`TestServer`].

use super::server::TestServer;
use notify_sync::announcements::{AnnouncementSource, FeatureAnnouncementFetcher, RetryPolicy};
use notify_sync::notifications::StaticAuth;
use notify_sync::onchain::OnChainRawNotification;
use notify_sync::{NotificationsService, TriggerApiClient, TriggerLifecycleManager, UserStorageClient};
use serde_json::{json, Value};
use std::sync::Arc;

pub const BEARER_TOKEN: &str = "test-bearer-token";
pub const STORAGE_KEY: &str = "test-storage-key";
pub const ACCOUNT: &str = "0xAAA";
pub const REQUEST_TIMEOUT_SEC: u64 = 5;

pub fn storage_client(server: &TestServer) -> UserStorageClient {
    UserStorageClient::new(server.user_storage_url(), REQUEST_TIMEOUT_SEC)
        .expect("Failed to build storage client")
        .with_bearer_token(BEARER_TOKEN)
}

pub fn trigger_api(server: &TestServer) -> TriggerApiClient {
    TriggerApiClient::new(&server.base_url, &server.base_url, REQUEST_TIMEOUT_SEC)
        .expect("Failed to build trigger API client")
}

pub fn lifecycle(server: &TestServer) -> TriggerLifecycleManager {
    TriggerLifecycleManager::new(Arc::new(storage_client(server)), Arc::new(trigger_api(server)))
}

/// `retries` attempts, 1 ms apart.
pub fn fast_retry(retries: u32) -> RetryPolicy {
    RetryPolicy {
        retries,
        retry_delay_ms: 1,
        attempt_timeout_secs: REQUEST_TIMEOUT_SEC,
    }
}

pub fn content_source(server: &TestServer) -> AnnouncementSource {
    let mut source = AnnouncementSource::new("space", "content-token");
    source.base_url = server.base_url.clone();
    source
}

pub fn announcement_fetcher(server: &TestServer, retries: u32) -> FeatureAnnouncementFetcher {
    FeatureAnnouncementFetcher::new(Some(content_source(server)), fast_retry(retries))
        .expect("Failed to build announcement fetcher")
}

pub fn notifications_service(server: &TestServer) -> NotificationsService {
    NotificationsService::new(
        lifecycle(server),
        announcement_fetcher(server, 1),
        Arc::new(StaticAuth::new(
            Some(BEARER_TOKEN.to_string()),
            Some(STORAGE_KEY.to_string()),
        )),
    )
}

/// Content source payload holding a single announcement.
pub fn announcement_payload() -> Value {
    json!({
        "items": [
            {
                "sys": { "id": "entry-1", "createdAt": "2024-04-09T13:24:01.872Z" },
                "fields": {
                    "id": "dont-miss-out-on-airdrops",
                    "title": "Don't miss out on airdrops",
                    "shortDescription": "Short",
                    "longDescription": {
                        "nodeType": "document",
                        "content": [
                            {
                                "nodeType": "paragraph",
                                "content": [
                                    { "nodeType": "text", "value": "Airdrops are here", "marks": [] }
                                ]
                            }
                        ]
                    },
                    "image": { "sys": { "id": "asset-1" } }
                }
            }
        ],
        "includes": {
            "Asset": [
                {
                    "sys": { "id": "asset-1" },
                    "fields": {
                        "title": "Airdrops",
                        "file": { "url": "//images.example/airdrops.png" }
                    }
                }
            ]
        }
    })
}

pub fn raw_notification(id: &str, trigger_id: &str, kind: &str, created_at: &str) -> OnChainRawNotification {
    OnChainRawNotification {
        id: id.to_string(),
        trigger_id: trigger_id.to_string(),
        chain_id: 1,
        block_number: 17485840,
        block_timestamp: created_at.to_string(),
        tx_hash: "0x881d".to_string(),
        unread: true,
        created_at: created_at.to_string(),
        notification_type: Some(kind.to_string()),
        data: json!({ "kind": kind }),
    }
}
