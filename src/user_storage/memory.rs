//! In-process user storage with the same semantics as the remote service.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::models::{StorageEntry, UserStorageFeature};
use super::trait_def::{StorageError, UserStorage};

/// User storage kept in memory.
///
/// Each feature holds an ordered list of entries. A feature that ends up with
/// zero entries is dropped, so reads report it as absent.
#[derive(Default)]
pub struct InMemoryUserStorage {
    features: RwLock<HashMap<String, Vec<StorageEntry>>>,
}

impl InMemoryUserStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn upsert(entries: &mut Vec<StorageEntry>, hashed_key: &str, data: &str) {
        match entries.iter_mut().find(|e| e.hashed_key == hashed_key) {
            Some(existing) => existing.data = data.to_string(),
            None => entries.push(StorageEntry::new(hashed_key, data)),
        }
    }

    fn drop_if_empty(features: &mut HashMap<String, Vec<StorageEntry>>, feature: &str) {
        if features.get(feature).is_some_and(|e| e.is_empty()) {
            features.remove(feature);
        }
    }
}

#[async_trait]
impl UserStorage for InMemoryUserStorage {
    async fn get_entry(
        &self,
        feature: &UserStorageFeature,
        hashed_key: &str,
    ) -> Result<Option<StorageEntry>, StorageError> {
        let features = self.features.read().await;
        Ok(features
            .get(feature.as_str())
            .and_then(|entries| entries.iter().find(|e| e.hashed_key == hashed_key))
            .cloned())
    }

    async fn get_all(
        &self,
        feature: &UserStorageFeature,
    ) -> Result<Option<Vec<StorageEntry>>, StorageError> {
        let features = self.features.read().await;
        Ok(features
            .get(feature.as_str())
            .filter(|entries| !entries.is_empty())
            .cloned())
    }

    async fn put(
        &self,
        feature: &UserStorageFeature,
        hashed_key: &str,
        data: &str,
    ) -> Result<(), StorageError> {
        let mut features = self.features.write().await;
        let entries = features.entry(feature.as_str().to_string()).or_default();
        Self::upsert(entries, hashed_key, data);
        Ok(())
    }

    async fn put_batch(
        &self,
        feature: &UserStorageFeature,
        entries: &HashMap<String, String>,
    ) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut features = self.features.write().await;
        let stored = features.entry(feature.as_str().to_string()).or_default();
        for (hashed_key, data) in entries {
            Self::upsert(stored, hashed_key, data);
        }
        Ok(())
    }

    async fn put_batch_delete(
        &self,
        feature: &UserStorageFeature,
        hashed_keys: &[String],
    ) -> Result<(), StorageError> {
        let mut features = self.features.write().await;
        if let Some(entries) = features.get_mut(feature.as_str()) {
            entries.retain(|e| !hashed_keys.contains(&e.hashed_key));
        }
        Self::drop_if_empty(&mut features, feature.as_str());
        Ok(())
    }

    async fn delete_entry(
        &self,
        feature: &UserStorageFeature,
        hashed_key: &str,
    ) -> Result<(), StorageError> {
        let mut features = self.features.write().await;
        if let Some(entries) = features.get_mut(feature.as_str()) {
            entries.retain(|e| e.hashed_key != hashed_key);
        }
        Self::drop_if_empty(&mut features, feature.as_str());
        Ok(())
    }

    async fn delete_all(&self, feature: &UserStorageFeature) -> Result<(), StorageError> {
        self.features.write().await.remove(feature.as_str());
        Ok(())
    }
}
