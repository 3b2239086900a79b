//! Pure functions over [`UserStorageTriggers`].
//!
//! None of these touch the network or mutate their input; callers get a new
//! snapshot back and decide whether to persist it.

use indexmap::IndexSet;
use std::collections::HashSet;

use super::kinds::TriggerKind;
use super::models::{AccountChains, ChainTriggers, TriggerDescriptor, TriggerEntry, UserStorageTriggers};

/// Depth-first traversal, one descriptor per leaf, in insertion order.
pub fn flatten(storage: &UserStorageTriggers) -> Vec<TriggerDescriptor> {
    let mut out = Vec::with_capacity(storage.len());
    for (account, chains) in &storage.accounts {
        for (chain, triggers) in chains {
            for (trigger_id, entry) in triggers {
                out.push(TriggerDescriptor::new(
                    account.as_str(),
                    chain.as_str(),
                    trigger_id.as_str(),
                    entry.kind.as_str(),
                    entry.enabled,
                ));
            }
        }
    }
    out
}

/// Entries of `desired` whose (account, chain, trigger id) is not in `storage`.
///
/// An empty result means there is nothing to create.
pub fn diff_for_create(
    storage: &UserStorageTriggers,
    desired: &[TriggerDescriptor],
) -> Vec<TriggerDescriptor> {
    desired
        .iter()
        .filter(|d| storage.trigger(&d.account, &d.chain, &d.trigger_id).is_none())
        .cloned()
        .collect()
}

/// Set `enabled` on every listed trigger. Unknown ids are ignored.
pub fn apply_enabled(
    storage: &UserStorageTriggers,
    trigger_ids: &[String],
    enabled: bool,
) -> UserStorageTriggers {
    let ids: HashSet<&str> = trigger_ids.iter().map(String::as_str).collect();
    let mut updated = storage.clone();
    for chains in updated.accounts.values_mut() {
        for triggers in chains.values_mut() {
            for (trigger_id, entry) in triggers.iter_mut() {
                if ids.contains(trigger_id.as_str()) {
                    entry.enabled = enabled;
                }
            }
        }
    }
    updated
}

/// Remove the listed triggers and cascade the cleanup upwards.
///
/// Child maps are rebuilt first; a chain with no triggers left and an account
/// with no chains left are not carried into the result.
pub fn remove_triggers(storage: &UserStorageTriggers, trigger_ids: &[String]) -> UserStorageTriggers {
    let ids: HashSet<&str> = trigger_ids.iter().map(String::as_str).collect();

    let accounts = storage
        .accounts
        .iter()
        .filter_map(|(account, chains)| {
            let chains: AccountChains = chains
                .iter()
                .filter_map(|(chain, triggers)| {
                    let kept: ChainTriggers = triggers
                        .iter()
                        .filter(|(trigger_id, _)| !ids.contains(trigger_id.as_str()))
                        .map(|(trigger_id, entry)| (trigger_id.clone(), entry.clone()))
                        .collect();
                    (!kept.is_empty()).then(|| (chain.clone(), kept))
                })
                .collect();
            (!chains.is_empty()).then(|| (account.clone(), chains))
        })
        .collect();

    UserStorageTriggers { accounts }
}

/// Add absent leaves, creating parents as needed. Existing leaves are untouched.
pub fn insert_triggers(
    storage: &UserStorageTriggers,
    descriptors: &[TriggerDescriptor],
) -> UserStorageTriggers {
    let mut updated = storage.clone();
    for d in descriptors {
        updated.insert_if_absent(
            &d.account,
            &d.chain,
            &d.trigger_id,
            TriggerEntry {
                kind: d.kind.clone(),
                enabled: d.enabled,
            },
        );
    }
    updated
}

/// Fresh storage with every supported kind on every supported chain for each account.
///
/// Addresses are lowercased; empty ones are skipped.
pub fn initialize(accounts: &[String], enabled: bool) -> UserStorageTriggers {
    let mut storage = UserStorageTriggers::new();
    for account in accounts {
        let account = account.trim().to_lowercase();
        if account.is_empty() {
            continue;
        }
        for kind in TriggerKind::ALL {
            for chain in kind.supported_chains() {
                let mut descriptor = TriggerDescriptor::generate(account.as_str(), *chain, kind.as_str());
                descriptor.enabled = enabled;
                storage.insert_if_absent(
                    &descriptor.account,
                    &descriptor.chain,
                    &descriptor.trigger_id,
                    TriggerEntry {
                        kind: descriptor.kind,
                        enabled,
                    },
                );
            }
        }
    }
    storage
}

/// Triggers (disabled, fresh ids) that `account` is missing for full coverage
/// of every supported kind on every supported chain.
pub fn missing_address_triggers(
    account: &str,
    storage: &UserStorageTriggers,
) -> Vec<TriggerDescriptor> {
    let account = account.to_lowercase();
    let mut missing = Vec::new();
    for kind in TriggerKind::ALL {
        for chain in kind.supported_chains() {
            let exists = storage
                .account(&account)
                .and_then(|chains| chains.get(*chain))
                .is_some_and(|triggers| triggers.values().any(|t| t.kind == kind.as_str()));
            if !exists {
                missing.push(TriggerDescriptor::generate(account.as_str(), *chain, kind.as_str()));
            }
        }
    }
    missing
}

/// Ensure every supported kind exists on every supported chain for `account`.
/// New triggers are disabled.
pub fn upsert_address_triggers(account: &str, storage: &UserStorageTriggers) -> UserStorageTriggers {
    insert_triggers(storage, &missing_address_triggers(account, storage))
}

/// Triggers (disabled, fresh ids) of `kind` missing from chains already
/// present under each account.
pub fn missing_kind_triggers(kind: &str, storage: &UserStorageTriggers) -> Vec<TriggerDescriptor> {
    let mut missing = Vec::new();
    for (account, chains) in &storage.accounts {
        for (chain, triggers) in chains {
            if !triggers.values().any(|t| t.kind == kind) {
                missing.push(TriggerDescriptor::generate(account.as_str(), chain.as_str(), kind));
            }
        }
    }
    missing
}

/// Ensure a trigger of `kind` exists on every chain of every account.
/// New triggers are disabled.
pub fn upsert_trigger_kind(kind: &str, storage: &UserStorageTriggers) -> UserStorageTriggers {
    insert_triggers(storage, &missing_kind_triggers(kind, storage))
}

pub fn all_trigger_ids(storage: &UserStorageTriggers) -> Vec<String> {
    flatten(storage).into_iter().map(|d| d.trigger_id).collect()
}

pub fn enabled_trigger_ids(storage: &UserStorageTriggers) -> Vec<String> {
    flatten(storage)
        .into_iter()
        .filter(|d| d.enabled)
        .map(|d| d.trigger_id)
        .collect()
}

pub fn trigger_ids_for_account(storage: &UserStorageTriggers, account: &str) -> Vec<String> {
    flatten(storage)
        .into_iter()
        .filter(|d| d.account == account)
        .map(|d| d.trigger_id)
        .collect()
}

pub fn trigger_ids_for_kinds(storage: &UserStorageTriggers, kinds: &[&str]) -> Vec<String> {
    flatten(storage)
        .into_iter()
        .filter(|d| kinds.contains(&d.kind.as_str()))
        .map(|d| d.trigger_id)
        .collect()
}

/// Distinct kinds present in storage, in first-seen order.
pub fn infer_enabled_kinds(storage: &UserStorageTriggers) -> Vec<String> {
    flatten(storage)
        .into_iter()
        .map(|d| d.kind)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}
