//! Nested Account -> Chain -> TriggerId mapping.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Stored state of one trigger.
///
/// Serialized with single-letter keys to keep synced records small.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerEntry {
    #[serde(rename = "k")]
    pub kind: String,
    #[serde(rename = "e")]
    pub enabled: bool,
}

/// Trigger id -> entry, for one chain.
pub type ChainTriggers = IndexMap<String, TriggerEntry>;

/// Chain id -> triggers, for one account.
pub type AccountChains = IndexMap<String, ChainTriggers>;

/// One flattened trigger leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerDescriptor {
    pub account: String,
    pub chain: String,
    pub trigger_id: String,
    pub kind: String,
    pub enabled: bool,
}

impl TriggerDescriptor {
    pub fn new(
        account: impl Into<String>,
        chain: impl Into<String>,
        trigger_id: impl Into<String>,
        kind: impl Into<String>,
        enabled: bool,
    ) -> Self {
        Self {
            account: account.into(),
            chain: chain.into(),
            trigger_id: trigger_id.into(),
            kind: kind.into(),
            enabled,
        }
    }

    /// A not-yet-stored trigger with a fresh id.
    pub fn generate(account: impl Into<String>, chain: impl Into<String>, kind: impl Into<String>) -> Self {
        Self::new(account, chain, uuid::Uuid::new_v4().to_string(), kind, false)
    }
}

/// Account(address) -> Chain(id) -> TriggerId -> entry.
///
/// An account exists only while at least one chain exists under it, and a
/// chain exists only while at least one trigger exists under it. All levels
/// keep insertion order. Mutation goes through the functions in
/// [`crate::triggers::state`], which return new values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserStorageTriggers {
    pub(crate) accounts: IndexMap<String, AccountChains>,
}

impl UserStorageTriggers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Total number of triggers across all accounts and chains.
    pub fn len(&self) -> usize {
        self.accounts
            .values()
            .flat_map(|chains| chains.values())
            .map(|triggers| triggers.len())
            .sum()
    }

    pub fn accounts(&self) -> impl Iterator<Item = (&String, &AccountChains)> {
        self.accounts.iter()
    }

    pub fn account(&self, account: &str) -> Option<&AccountChains> {
        self.accounts.get(account)
    }

    pub fn contains_account(&self, account: &str) -> bool {
        self.accounts.contains_key(account)
    }

    pub fn trigger(&self, account: &str, chain: &str, trigger_id: &str) -> Option<&TriggerEntry> {
        self.accounts.get(account)?.get(chain)?.get(trigger_id)
    }

    /// Insert a leaf, creating parents as needed. Existing leaves are kept.
    pub(crate) fn insert_if_absent(
        &mut self,
        account: &str,
        chain: &str,
        trigger_id: &str,
        entry: TriggerEntry,
    ) {
        self.accounts
            .entry(account.to_string())
            .or_default()
            .entry(chain.to_string())
            .or_default()
            .entry(trigger_id.to_string())
            .or_insert(entry);
    }

    /// Build a snapshot from flattened leaves. Later duplicates are ignored.
    pub fn from_descriptors<'a>(descriptors: impl IntoIterator<Item = &'a TriggerDescriptor>) -> Self {
        let mut storage = Self::new();
        for d in descriptors {
            storage.insert_if_absent(
                &d.account,
                &d.chain,
                &d.trigger_id,
                TriggerEntry {
                    kind: d.kind.clone(),
                    enabled: d.enabled,
                },
            );
        }
        storage
    }
}
