//! Session-level notifications orchestration.

use indexmap::{IndexMap, IndexSet};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::auth::AuthProvider;
use super::models::{MarkAsReadRequest, Notification, FEATURES_ANNOUNCEMENT};
use super::processing::{apply_read_ids, process_on_chain_notification, sort_newest_first};
use crate::announcements::FeatureAnnouncementFetcher;
use crate::lifecycle::{LifecycleError, TriggerLifecycleManager};
use crate::triggers::{self, TriggerKind, UserStorageTriggers};

#[derive(Debug, Error)]
pub enum NotificationsError {
    #[error("Missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("No trigger storage found for this user")]
    MissingStorage,

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Observable state of a notifications session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotificationsState {
    pub is_notifications_enabled: bool,
    pub is_feature_announcements_enabled: bool,
    pub is_feature_seen: bool,
    /// Last merged feed, newest first.
    pub notifications: Vec<Notification>,
    /// Ids read in this session, without duplicates.
    pub read_ids: IndexSet<String>,
}

struct Credentials {
    bearer_token: String,
    storage_key: String,
}

/// Owns the in-memory trigger snapshot and the merged notification feed.
pub struct NotificationsService {
    lifecycle: TriggerLifecycleManager,
    announcements: FeatureAnnouncementFetcher,
    auth: Arc<dyn AuthProvider>,
    triggers: RwLock<UserStorageTriggers>,
    state: RwLock<NotificationsState>,
    /// Held across every read-modify-write of `triggers`.
    mutation: Mutex<()>,
}

impl NotificationsService {
    pub fn new(
        lifecycle: TriggerLifecycleManager,
        announcements: FeatureAnnouncementFetcher,
        auth: Arc<dyn AuthProvider>,
    ) -> Self {
        Self {
            lifecycle,
            announcements,
            auth,
            triggers: RwLock::new(UserStorageTriggers::new()),
            state: RwLock::new(NotificationsState::default()),
            mutation: Mutex::new(()),
        }
    }

    pub async fn state(&self) -> NotificationsState {
        self.state.read().await.clone()
    }

    pub async fn triggers(&self) -> UserStorageTriggers {
        self.triggers.read().await.clone()
    }

    pub async fn set_feature_announcements_enabled(&self, enabled: bool) {
        self.state.write().await.is_feature_announcements_enabled = enabled;
    }

    pub async fn set_notifications_enabled(&self, enabled: bool) {
        self.state.write().await.is_notifications_enabled = enabled;
    }

    pub async fn mark_feature_seen(&self) {
        self.state.write().await.is_feature_seen = true;
    }

    async fn credentials(&self) -> Result<Credentials, NotificationsError> {
        let bearer_token = self
            .auth
            .bearer_token()
            .await
            .filter(|t| !t.is_empty())
            .ok_or(NotificationsError::MissingCredentials("bearer token"))?;
        let storage_key = self
            .auth
            .storage_key()
            .await
            .filter(|k| !k.is_empty())
            .ok_or(NotificationsError::MissingCredentials("storage key"))?;
        Ok(Credentials {
            bearer_token,
            storage_key,
        })
    }

    /// Replace the in-memory snapshot with the stored one.
    pub async fn load_triggers(&self) -> Result<UserStorageTriggers, NotificationsError> {
        let _mutation = self.mutation.lock().await;
        let creds = self.credentials().await?;
        let loaded = self.lifecycle.load_triggers(&creds.storage_key).await?;
        *self.triggers.write().await = loaded.clone();
        Ok(loaded)
    }

    /// Snapshot to work from: the in-memory one, else the stored one.
    async fn current_triggers(&self, creds: &Credentials) -> Result<UserStorageTriggers, NotificationsError> {
        let snapshot = self.triggers().await;
        if !snapshot.is_empty() {
            return Ok(snapshot);
        }
        Ok(self.lifecycle.load_triggers(&creds.storage_key).await?)
    }

    /// Create and enable triggers for `accounts`.
    ///
    /// With no stored triggers, a disabled full set is generated first for
    /// every account.
    pub async fn create_on_chain_triggers(
        &self,
        accounts: &[String],
    ) -> Result<UserStorageTriggers, NotificationsError> {
        let _mutation = self.mutation.lock().await;
        let creds = self.credentials().await?;
        let mut snapshot = self.current_triggers(&creds).await?;
        if snapshot.is_empty() {
            snapshot = triggers::initialize(accounts, false);
        }

        let pending = triggers::flatten(&snapshot);
        let updated = self
            .lifecycle
            .create_on_chain_triggers(&snapshot, &creds.storage_key, &creds.bearer_token, &pending)
            .await?;

        *self.triggers.write().await = updated.clone();
        self.state.write().await.is_notifications_enabled = true;
        info!(accounts = accounts.len(), triggers = updated.len(), "Enabled on-chain notifications");
        Ok(updated)
    }

    /// Ensure full coverage for `account` and enable whatever is disabled.
    pub async fn update_on_chain_triggers_by_account(
        &self,
        account: &str,
    ) -> Result<UserStorageTriggers, NotificationsError> {
        let account = account.to_lowercase();
        self.enable_pending(
            |snapshot| triggers::upsert_address_triggers(&account, snapshot),
            |d| d.account == account,
        )
        .await
    }

    /// Ensure `kind` exists on every stored chain and enable whatever is disabled.
    pub async fn update_on_chain_triggers_by_kind(
        &self,
        kind: TriggerKind,
    ) -> Result<UserStorageTriggers, NotificationsError> {
        self.enable_pending(
            |snapshot| triggers::upsert_trigger_kind(kind.as_str(), snapshot),
            |d| d.kind == kind.as_str(),
        )
        .await
    }

    async fn enable_pending<U, F>(&self, upsert: U, selects: F) -> Result<UserStorageTriggers, NotificationsError>
    where
        U: FnOnce(&UserStorageTriggers) -> UserStorageTriggers,
        F: Fn(&triggers::TriggerDescriptor) -> bool,
    {
        let _mutation = self.mutation.lock().await;
        let creds = self.credentials().await?;
        let snapshot = self.current_triggers(&creds).await?;
        if snapshot.is_empty() {
            return Err(NotificationsError::MissingStorage);
        }

        let upserted = upsert(&snapshot);
        let pending: Vec<_> = triggers::flatten(&upserted)
            .into_iter()
            .filter(|d| selects(d) && !d.enabled)
            .collect();

        let updated = self
            .lifecycle
            .create_on_chain_triggers(&upserted, &creds.storage_key, &creds.bearer_token, &pending)
            .await?;
        *self.triggers.write().await = updated.clone();
        Ok(updated)
    }

    pub async fn delete_on_chain_triggers_by_account(
        &self,
        account: &str,
    ) -> Result<UserStorageTriggers, NotificationsError> {
        let account = account.to_lowercase();
        self.delete_selected(|snapshot| triggers::trigger_ids_for_account(snapshot, &account))
            .await
    }

    pub async fn delete_on_chain_triggers_by_kind(
        &self,
        kind: TriggerKind,
    ) -> Result<UserStorageTriggers, NotificationsError> {
        self.delete_selected(|snapshot| triggers::trigger_ids_for_kinds(snapshot, &[kind.as_str()]))
            .await
    }

    async fn delete_selected<F>(&self, select: F) -> Result<UserStorageTriggers, NotificationsError>
    where
        F: FnOnce(&UserStorageTriggers) -> Vec<String>,
    {
        let _mutation = self.mutation.lock().await;
        let creds = self.credentials().await?;
        let snapshot = self.current_triggers(&creds).await?;
        let ids = select(&snapshot);

        let updated = self
            .lifecycle
            .delete_on_chain_triggers(&snapshot, &creds.storage_key, &creds.bearer_token, &ids)
            .await?;
        *self.triggers.write().await = updated.clone();
        Ok(updated)
    }

    /// Lowercased account -> whether it is fully enabled in the current snapshot.
    pub async fn check_accounts_presence(&self, accounts: &[String]) -> IndexMap<String, bool> {
        triggers::check_accounts_presence(&*self.triggers.read().await, accounts)
    }

    /// Fetch both sources, merge them newest first and store the feed.
    ///
    /// A failing source contributes nothing; this never fails.
    pub async fn fetch_and_update_notifications(&self) -> Vec<Notification> {
        let (announcements_enabled, notifications_enabled, read_ids) = {
            let state = self.state.read().await;
            (
                state.is_feature_announcements_enabled,
                state.is_notifications_enabled,
                state.read_ids.clone(),
            )
        };

        let announcements = async {
            if !announcements_enabled {
                return Vec::new();
            }
            self.announcements.get_feature_announcement_notifications().await
        };
        let on_chain = async {
            if !notifications_enabled {
                return Vec::new();
            }
            let creds = match self.credentials().await {
                Ok(creds) => creds,
                Err(e) => {
                    warn!(error = %e, "Skipping on-chain notifications");
                    return Vec::new();
                }
            };
            let snapshot = match self.current_triggers(&creds).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!(error = %e, "Failed to load triggers for notifications");
                    return Vec::new();
                }
            };
            self.lifecycle
                .get_on_chain_notifications(&snapshot, &creds.bearer_token)
                .await
        };
        let (announcements, on_chain) = futures::join!(announcements, on_chain);

        let mut merged: Vec<Notification> = announcements
            .into_iter()
            .map(|n| apply_read_ids(n, &read_ids))
            .chain(
                on_chain
                    .into_iter()
                    .filter_map(|raw| process_on_chain_notification(raw, &read_ids)),
            )
            .collect();
        sort_newest_first(&mut merged);

        self.state.write().await.notifications = merged.clone();
        merged
    }

    /// Mark notifications read.
    ///
    /// Unread feature announcements are recorded locally. Unread on-chain
    /// notifications are sent to the backend; if that fails the error is
    /// returned and only the announcements are recorded.
    pub async fn mark_notifications_as_read(
        &self,
        notifications: &[MarkAsReadRequest],
    ) -> Result<(), NotificationsError> {
        let (announcement_ids, on_chain_ids): (Vec<String>, Vec<String>) = {
            let (announcements, on_chain): (Vec<_>, Vec<_>) = notifications
                .iter()
                .filter(|n| !n.is_read)
                .partition(|n| n.notification_type == FEATURES_ANNOUNCEMENT);
            (
                announcements.into_iter().map(|n| n.id.clone()).collect(),
                on_chain.into_iter().map(|n| n.id.clone()).collect(),
            )
        };

        self.record_read(&announcement_ids).await;

        if !on_chain_ids.is_empty() {
            let creds = self.credentials().await?;
            self.lifecycle
                .mark_notifications_as_read(&creds.bearer_token, &on_chain_ids)
                .await?;
            self.record_read(&on_chain_ids).await;
        }
        Ok(())
    }

    async fn record_read(&self, ids: &[String]) {
        if ids.is_empty() {
            return;
        }
        let mut state = self.state.write().await;
        state.read_ids.extend(ids.iter().cloned());
        let NotificationsState {
            notifications,
            read_ids,
            ..
        } = &mut *state;
        for notification in notifications.iter_mut() {
            if read_ids.contains(&notification.id) {
                notification.is_read = true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announcements::RetryPolicy;
    use crate::notifications::StaticAuth;
    use crate::onchain::{MockTriggerApi, OnChainRawNotification, TriggerApiError};
    use crate::user_storage::InMemoryUserStorage;

    fn raw(id: &str, created_at: &str) -> OnChainRawNotification {
        OnChainRawNotification {
            id: id.to_string(),
            trigger_id: "t1".to_string(),
            chain_id: 1,
            block_number: 1,
            block_timestamp: created_at.to_string(),
            tx_hash: "0x1".to_string(),
            unread: true,
            created_at: created_at.to_string(),
            notification_type: None,
            data: serde_json::json!({ "kind": "eth_received" }),
        }
    }

    fn service_with(api: MockTriggerApi, auth: StaticAuth) -> NotificationsService {
        let lifecycle = TriggerLifecycleManager::new(Arc::new(InMemoryUserStorage::new()), Arc::new(api));
        let announcements = FeatureAnnouncementFetcher::new(None, RetryPolicy::default()).unwrap();
        NotificationsService::new(lifecycle, announcements, Arc::new(auth))
    }

    fn auth() -> StaticAuth {
        StaticAuth::new(Some("token".to_string()), Some("storage-key".to_string()))
    }

    fn echo_create(api: &mut MockTriggerApi) {
        api.expect_batch_create()
            .returning(|_, triggers| Ok(triggers.iter().map(|t| t.id.clone()).collect()));
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let service = service_with(MockTriggerApi::new(), StaticAuth::new(None, Some("k".to_string())));
        let err = service
            .create_on_chain_triggers(&["0xaaa".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationsError::MissingCredentials("bearer token")));
    }

    #[tokio::test]
    async fn test_create_initializes_and_enables() {
        let mut api = MockTriggerApi::new();
        echo_create(&mut api);
        let service = service_with(api, auth());

        let created = service
            .create_on_chain_triggers(&["0xAAA".to_string()])
            .await
            .unwrap();

        assert!(created.contains_account("0xaaa"));
        assert_eq!(triggers::enabled_trigger_ids(&created).len(), created.len());
        assert!(service.state().await.is_notifications_enabled);
        assert_eq!(
            service.check_accounts_presence(&["0xaaa".to_string()]).await.get("0xaaa"),
            Some(&true)
        );

        // storage round trip
        assert_eq!(service.load_triggers().await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_update_and_delete_by_account() {
        let mut api = MockTriggerApi::new();
        echo_create(&mut api);
        api.expect_batch_delete().times(1).returning(|_, _| Ok(()));
        let service = service_with(api, auth());

        service.create_on_chain_triggers(&["0xaaa".to_string()]).await.unwrap();
        let updated = service.update_on_chain_triggers_by_account("0xBBB").await.unwrap();
        assert!(updated.contains_account("0xbbb"));
        assert_eq!(
            service
                .check_accounts_presence(&["0xaaa".to_string(), "0xbbb".to_string()])
                .await
                .values()
                .filter(|p| **p)
                .count(),
            2
        );

        let remaining = service.delete_on_chain_triggers_by_account("0xbbb").await.unwrap();
        assert!(!remaining.contains_account("0xbbb"));
        assert!(remaining.contains_account("0xaaa"));
    }

    #[tokio::test]
    async fn test_update_and_delete_by_kind() {
        let mut api = MockTriggerApi::new();
        echo_create(&mut api);
        api.expect_batch_delete()
            .times(1)
            .withf(|_, ids| !ids.is_empty())
            .returning(|_, _| Ok(()));
        let service = service_with(api, auth());

        service.create_on_chain_triggers(&["0xaaa".to_string()]).await.unwrap();
        let without_lido = service
            .delete_on_chain_triggers_by_kind(TriggerKind::LidoStakeCompleted)
            .await
            .unwrap();
        assert!(triggers::trigger_ids_for_kinds(&without_lido, &["lido_stake_completed"]).is_empty());

        let restored = service
            .update_on_chain_triggers_by_kind(TriggerKind::LidoStakeCompleted)
            .await
            .unwrap();
        // restored on every chain present under the account
        assert_eq!(
            triggers::trigger_ids_for_kinds(&restored, &["lido_stake_completed"]).len(),
            restored.account("0xaaa").unwrap().len()
        );
    }

    #[tokio::test]
    async fn test_update_without_storage_fails() {
        let service = service_with(MockTriggerApi::new(), auth());
        let err = service
            .update_on_chain_triggers_by_account("0xaaa")
            .await
            .unwrap_err();
        assert!(matches!(err, NotificationsError::MissingStorage));
    }

    #[tokio::test]
    async fn test_fetch_merges_and_survives_backend_failure() {
        let mut api = MockTriggerApi::new();
        echo_create(&mut api);
        let mut calls = 0;
        api.expect_list_notifications().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(vec![
                    raw("old", "2023-01-01T00:00:00Z"),
                    raw("new", "2024-01-01T00:00:00Z"),
                ])
            } else {
                Err(TriggerApiError::Status {
                    status: 500,
                    body: "boom".to_string(),
                })
            }
        });
        let service = service_with(api, auth());
        service.create_on_chain_triggers(&["0xaaa".to_string()]).await.unwrap();

        let feed = service.fetch_and_update_notifications().await;
        let ids: Vec<&str> = feed.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(service.state().await.notifications, feed);

        assert!(service.fetch_and_update_notifications().await.is_empty());
    }

    #[tokio::test]
    async fn test_mark_as_read_splits_sources() {
        let mut api = MockTriggerApi::new();
        api.expect_mark_notifications_as_read()
            .times(1)
            .withf(|_, ids| ids.len() == 1 && ids[0] == "chain-1")
            .returning(|_, _| Ok(()));
        let service = service_with(api, auth());

        let requests = vec![
            MarkAsReadRequest {
                id: "chain-1".to_string(),
                notification_type: "eth_sent".to_string(),
                is_read: false,
            },
            MarkAsReadRequest {
                id: "chain-2".to_string(),
                notification_type: "eth_sent".to_string(),
                is_read: true,
            },
            MarkAsReadRequest {
                id: "feature-1".to_string(),
                notification_type: FEATURES_ANNOUNCEMENT.to_string(),
                is_read: false,
            },
        ];
        service.mark_notifications_as_read(&requests).await.unwrap();
        service.mark_notifications_as_read(&requests[2..]).await.unwrap();

        let read: Vec<String> = service.state().await.read_ids.into_iter().collect();
        assert_eq!(read, vec!["feature-1".to_string(), "chain-1".to_string()]);
    }

    #[tokio::test]
    async fn test_mark_as_read_failure_keeps_announcements() {
        let mut api = MockTriggerApi::new();
        api.expect_mark_notifications_as_read().returning(|_, _| {
            Err(TriggerApiError::Status {
                status: 500,
                body: "down".to_string(),
            })
        });
        let service = service_with(api, auth());

        let requests = vec![
            MarkAsReadRequest {
                id: "chain-1".to_string(),
                notification_type: "eth_sent".to_string(),
                is_read: false,
            },
            MarkAsReadRequest {
                id: "feature-1".to_string(),
                notification_type: FEATURES_ANNOUNCEMENT.to_string(),
                is_read: false,
            },
        ];
        assert!(service.mark_notifications_as_read(&requests).await.is_err());
        let read: Vec<String> = service.state().await.read_ids.into_iter().collect();
        assert_eq!(read, vec!["feature-1".to_string()]);
    }

    /// Echoes creates and deletes after a short pause.
    struct SlowTriggerApi;

    #[async_trait::async_trait]
    impl crate::onchain::TriggerApi for SlowTriggerApi {
        async fn batch_create(
            &self,
            _auth_token: &str,
            triggers: &[crate::onchain::TriggerCreateRequest],
        ) -> Result<Vec<String>, TriggerApiError> {
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            Ok(triggers.iter().map(|t| t.id.clone()).collect())
        }

        async fn batch_delete(&self, _auth_token: &str, _trigger_ids: &[String]) -> Result<(), TriggerApiError> {
            tokio::time::sleep(std::time::Duration::from_millis(30)).await;
            Ok(())
        }

        async fn list_notifications(
            &self,
            _auth_token: &str,
            _trigger_ids: &[String],
        ) -> Result<Vec<OnChainRawNotification>, TriggerApiError> {
            Ok(Vec::new())
        }

        async fn mark_notifications_as_read(
            &self,
            _auth_token: &str,
            _notification_ids: &[String],
        ) -> Result<(), TriggerApiError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_concurrent_changes_keep_both_updates() {
        let lifecycle = TriggerLifecycleManager::new(
            Arc::new(InMemoryUserStorage::new()),
            Arc::new(SlowTriggerApi),
        );
        let announcements = FeatureAnnouncementFetcher::new(None, RetryPolicy::default()).unwrap();
        let service = NotificationsService::new(lifecycle, announcements, Arc::new(auth()));

        service.create_on_chain_triggers(&["0xaaa".to_string()]).await.unwrap();

        let (added, removed) = tokio::join!(
            service.update_on_chain_triggers_by_account("0xbbb"),
            service.delete_on_chain_triggers_by_account("0xaaa"),
        );
        added.unwrap();
        removed.unwrap();

        let in_memory = service.triggers().await;
        assert!(in_memory.contains_account("0xbbb"));
        assert!(!in_memory.contains_account("0xaaa"));
        assert_eq!(service.load_triggers().await.unwrap(), in_memory);
    }
}
