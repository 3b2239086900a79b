//! Create/delete orchestration between the trigger backend and user storage.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use super::record::{record_key, AccountRecord, RECORD_VERSION};
use crate::onchain::{OnChainRawNotification, TriggerApi, TriggerApiError, TriggerCreateRequest};
use crate::triggers::{self, AccountChains, TriggerDescriptor, UserStorageTriggers};
use crate::user_storage::{StorageError, UserStorage, UserStorageFeature};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Api(#[from] TriggerApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to encode trigger record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Moves triggers between Absent and Enabled.
///
/// Each operation takes the caller's snapshot by reference and, on success,
/// returns the new snapshot. On failure the caller's snapshot is the
/// unchanged state. Operations touching the same account run one at a time.
pub struct TriggerLifecycleManager {
    storage: Arc<dyn UserStorage>,
    api: Arc<dyn TriggerApi>,
    account_locks: AccountLocks,
}

type AccountLocks = StdMutex<HashMap<String, Arc<Mutex<()>>>>;

/// Held per-account locks. On drop the locks are released and map entries
/// nobody else holds or waits on are removed.
struct AccountGuards<'a> {
    locks: &'a AccountLocks,
    guards: Vec<(String, OwnedMutexGuard<()>)>,
}

impl Drop for AccountGuards<'_> {
    fn drop(&mut self) {
        let released: Vec<String> = self
            .guards
            .drain(..)
            .map(|(account, guard)| {
                drop(guard);
                account
            })
            .collect();

        let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        for account in released {
            if map
                .get(&account)
                .is_some_and(|lock| Arc::strong_count(lock) == 1)
            {
                map.remove(&account);
            }
        }
    }
}

impl TriggerLifecycleManager {
    pub fn new(storage: Arc<dyn UserStorage>, api: Arc<dyn TriggerApi>) -> Self {
        Self {
            storage,
            api,
            account_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Acquire the per-account locks in sorted order.
    async fn lock_accounts(&self, accounts: &BTreeSet<String>) -> AccountGuards<'_> {
        let locks: Vec<(String, Arc<Mutex<()>>)> = {
            let mut map = self
                .account_locks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            accounts
                .iter()
                .map(|account| (account.clone(), map.entry(account.clone()).or_default().clone()))
                .collect()
        };

        let mut held = AccountGuards {
            locks: &self.account_locks,
            guards: Vec::with_capacity(locks.len()),
        };
        for (account, lock) in locks {
            held.guards.push((account, lock.lock_owned().await));
        }
        held
    }

    #[cfg(test)]
    fn tracked_accounts(&self) -> usize {
        self.account_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Create `descriptors` on the backend, then enable and persist them.
    ///
    /// Account addresses are lowercased. An empty list returns the snapshot
    /// as is without any network call.
    pub async fn create_on_chain_triggers(
        &self,
        storage: &UserStorageTriggers,
        storage_key: &str,
        auth_token: &str,
        descriptors: &[TriggerDescriptor],
    ) -> Result<UserStorageTriggers, LifecycleError> {
        if descriptors.is_empty() {
            return Ok(storage.clone());
        }
        let descriptors: Vec<TriggerDescriptor> = descriptors
            .iter()
            .map(|d| TriggerDescriptor {
                account: d.account.to_lowercase(),
                ..d.clone()
            })
            .collect();

        let accounts: BTreeSet<String> = descriptors.iter().map(|t| t.account.clone()).collect();
        let _guards = self.lock_accounts(&accounts).await;

        let requests: Vec<TriggerCreateRequest> = descriptors
            .iter()
            .map(|t| TriggerCreateRequest {
                id: t.trigger_id.clone(),
                chain_id: t.chain.clone(),
                kind: t.kind.clone(),
                address: t.account.clone(),
            })
            .collect();

        let created = self.api.batch_create(auth_token, &requests).await?;

        let updated = triggers::apply_enabled(
            &triggers::insert_triggers(storage, &descriptors),
            &created,
            true,
        );
        self.persist_accounts(&updated, storage_key, &accounts).await?;

        info!(
            requested = descriptors.len(),
            new = triggers::diff_for_create(storage, &descriptors).len(),
            enabled = created.len(),
            "Created on-chain triggers"
        );
        Ok(updated)
    }

    /// Delete triggers on the backend, then remove them locally and persist.
    ///
    /// Accounts left without triggers lose their stored record. An empty id
    /// list is a no-op.
    pub async fn delete_on_chain_triggers(
        &self,
        storage: &UserStorageTriggers,
        storage_key: &str,
        auth_token: &str,
        trigger_ids: &[String],
    ) -> Result<UserStorageTriggers, LifecycleError> {
        if trigger_ids.is_empty() {
            return Ok(storage.clone());
        }

        let ids: HashSet<&str> = trigger_ids.iter().map(String::as_str).collect();
        let accounts: BTreeSet<String> = triggers::flatten(storage)
            .into_iter()
            .filter(|d| ids.contains(d.trigger_id.as_str()))
            .map(|d| d.account.to_lowercase())
            .collect();
        let _guards = self.lock_accounts(&accounts).await;

        self.api.batch_delete(auth_token, trigger_ids).await?;

        let updated = triggers::remove_triggers(storage, trigger_ids);
        self.persist_accounts(&updated, storage_key, &accounts).await?;

        info!(
            count = trigger_ids.len(),
            accounts = accounts.len(),
            "Deleted on-chain triggers"
        );
        Ok(updated)
    }

    /// Notifications for the enabled triggers of `storage`.
    ///
    /// Never fails: backend errors are logged and yield an empty list.
    pub async fn get_on_chain_notifications(
        &self,
        storage: &UserStorageTriggers,
        auth_token: &str,
    ) -> Vec<OnChainRawNotification> {
        let trigger_ids = triggers::enabled_trigger_ids(storage);
        if trigger_ids.is_empty() {
            return Vec::new();
        }

        match self.api.list_notifications(auth_token, &trigger_ids).await {
            Ok(notifications) => notifications,
            Err(e) => {
                warn!(error = %e, "Failed to fetch on-chain notifications");
                Vec::new()
            }
        }
    }

    pub async fn mark_notifications_as_read(
        &self,
        auth_token: &str,
        notification_ids: &[String],
    ) -> Result<(), LifecycleError> {
        if notification_ids.is_empty() {
            return Ok(());
        }
        self.api
            .mark_notifications_as_read(auth_token, notification_ids)
            .await?;
        debug!(count = notification_ids.len(), "Marked notifications as read");
        Ok(())
    }

    /// Rebuild the snapshot from the stored per-account records.
    ///
    /// Records that cannot be decoded, carry another version, or are not
    /// keyed under `storage_key` are skipped.
    pub async fn load_triggers(&self, storage_key: &str) -> Result<UserStorageTriggers, LifecycleError> {
        let entries = self
            .storage
            .get_all(&UserStorageFeature::Notifications)
            .await?
            .unwrap_or_default();

        let mut snapshot = UserStorageTriggers::new();
        for entry in entries {
            let record = match AccountRecord::decode(&entry.data) {
                Ok(record) => record,
                Err(e) => {
                    warn!(hashed_key = %entry.hashed_key, error = %e, "Skipping malformed trigger record");
                    continue;
                }
            };
            if record.version != RECORD_VERSION {
                warn!(hashed_key = %entry.hashed_key, version = %record.version, "Skipping trigger record with unknown version");
                continue;
            }
            if record_key(&record.account, storage_key) != entry.hashed_key {
                warn!(hashed_key = %entry.hashed_key, "Skipping trigger record stored under a different key");
                continue;
            }

            let account = record.account.to_lowercase();
            for (chain, chain_triggers) in record.chains {
                for (trigger_id, entry) in chain_triggers {
                    snapshot.insert_if_absent(
                        &account,
                        &chain,
                        &trigger_id,
                        entry,
                    );
                }
            }
        }

        debug!(triggers = snapshot.len(), "Loaded trigger snapshot");
        Ok(snapshot)
    }

    /// Write the records of `accounts` as they are in `storage`: present
    /// accounts are upserted in one batch, absent ones are batch-deleted.
    ///
    /// Snapshot accounts differing only in case share one record.
    async fn persist_accounts(
        &self,
        storage: &UserStorageTriggers,
        storage_key: &str,
        accounts: &BTreeSet<String>,
    ) -> Result<(), LifecycleError> {
        let mut upserts = HashMap::new();
        let mut removals = Vec::new();

        for account in accounts {
            let key = record_key(account, storage_key);
            let mut chains = AccountChains::new();
            for (_, account_chains) in storage
                .accounts()
                .filter(|(name, _)| name.eq_ignore_ascii_case(account))
            {
                for (chain, chain_triggers) in account_chains {
                    chains
                        .entry(chain.clone())
                        .or_default()
                        .extend(chain_triggers.iter().map(|(id, e)| (id.clone(), e.clone())));
                }
            }

            if chains.is_empty() {
                removals.push(key);
            } else {
                let record = AccountRecord::new(account.to_lowercase(), chains);
                upserts.insert(key, record.encode()?);
            }
        }

        let feature = UserStorageFeature::Notifications;
        if !upserts.is_empty() {
            self.storage.put_batch(&feature, &upserts).await?;
        }
        if !removals.is_empty() {
            self.storage.put_batch_delete(&feature, &removals).await?;
        }
        Ok(())
    }
}
