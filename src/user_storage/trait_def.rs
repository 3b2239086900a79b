//! UserStorage trait definition.
//!
//! Abstracts the hashed-key remote store so the lifecycle code can run against
//! the HTTP client or the in-memory implementation.

use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

use super::models::{StorageEntry, UserStorageFeature};

/// Errors returned by user storage implementations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("User storage request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("User storage responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid user storage response: {0}")]
    InvalidResponse(String),
}

/// Operations over per-feature collections of hashed-key entries.
///
/// Every write is idempotent: repeating a delete or an identical put leaves
/// the collection in the same state.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Exact-match lookup of one entry. `None` if the key is absent.
    async fn get_entry(
        &self,
        feature: &UserStorageFeature,
        hashed_key: &str,
    ) -> Result<Option<StorageEntry>, StorageError>;

    /// The whole collection, or `None` if it holds zero entries.
    async fn get_all(
        &self,
        feature: &UserStorageFeature,
    ) -> Result<Option<Vec<StorageEntry>>, StorageError>;

    /// Upsert one entry: replace `data` in place if the key exists, else append.
    async fn put(
        &self,
        feature: &UserStorageFeature,
        hashed_key: &str,
        data: &str,
    ) -> Result<(), StorageError>;

    /// Apply the upsert-or-append rule independently per key.
    async fn put_batch(
        &self,
        feature: &UserStorageFeature,
        entries: &HashMap<String, String>,
    ) -> Result<(), StorageError>;

    /// Remove every listed key. Absent keys are ignored.
    async fn put_batch_delete(
        &self,
        feature: &UserStorageFeature,
        hashed_keys: &[String],
    ) -> Result<(), StorageError>;

    /// Delete one entry by key.
    async fn delete_entry(
        &self,
        feature: &UserStorageFeature,
        hashed_key: &str,
    ) -> Result<(), StorageError>;

    /// Clear the whole feature collection.
    async fn delete_all(&self, feature: &UserStorageFeature) -> Result<(), StorageError>;
}
