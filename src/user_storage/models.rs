//! Wire and domain types for the hashed-key user storage.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

/// A single entry of a feature collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageEntry {
    #[serde(rename = "HashedKey")]
    pub hashed_key: String,
    #[serde(rename = "Data")]
    pub data: String,
}

impl StorageEntry {
    pub fn new(hashed_key: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            hashed_key: hashed_key.into(),
            data: data.into(),
        }
    }
}

/// Named partition of the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UserStorageFeature {
    Accounts,
    Networks,
    Notifications,
    Other(String),
}

impl UserStorageFeature {
    pub fn as_str(&self) -> &str {
        match self {
            UserStorageFeature::Accounts => "accounts",
            UserStorageFeature::Networks => "networks",
            UserStorageFeature::Notifications => "notifications",
            UserStorageFeature::Other(name) => name,
        }
    }
}

impl fmt::Display for UserStorageFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for UserStorageFeature {
    fn from(name: &str) -> Self {
        match name {
            "accounts" => UserStorageFeature::Accounts,
            "networks" => UserStorageFeature::Networks,
            "notifications" => UserStorageFeature::Notifications,
            other => UserStorageFeature::Other(other.to_string()),
        }
    }
}

/// Body of `PUT /{feature}/{hashedKey}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutEntryBody {
    pub data: String,
}

/// Body of `PUT /{feature}`.
///
/// Batch deletion is expressed as a PUT variant, not as a DELETE with a body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PutFeatureBody {
    Upsert { data: HashMap<String, String> },
    BatchDelete { batch_delete: Vec<String> },
}

/// Derive the hashed key addressing `entry_key` for the user owning `storage_key`.
///
/// Lowercase hex SHA-256 of the two values concatenated.
pub fn create_hashed_key(entry_key: &str, storage_key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(entry_key.as_bytes());
    hasher.update(storage_key.as_bytes());
    format!("{:x}", hasher.finalize())
}
