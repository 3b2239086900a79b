//! Per-account trigger record as persisted in the `notifications` collection.

use serde::{Deserialize, Serialize};

use crate::triggers::AccountChains;
use crate::user_storage::create_hashed_key;

pub const RECORD_VERSION: &str = "1";

/// `{"v": "1", "a": account, "c": {chain: {id: {"k", "e"}}}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    #[serde(rename = "v")]
    pub version: String,
    #[serde(rename = "a")]
    pub account: String,
    #[serde(rename = "c")]
    pub chains: AccountChains,
}

impl AccountRecord {
    pub fn new(account: impl Into<String>, chains: AccountChains) -> Self {
        Self {
            version: RECORD_VERSION.to_string(),
            account: account.into(),
            chains,
        }
    }

    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn decode(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}

/// Hashed key of an account's record for the given storage key.
pub fn record_key(account: &str, storage_key: &str) -> String {
    create_hashed_key(&account.to_lowercase(), storage_key)
}
