//! Coverage checks over a trigger snapshot.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

use super::kinds::{TriggerGroup, TriggerKind};
use super::models::UserStorageTriggers;

/// Lowercased account -> whether it is fully enabled.
///
/// An account counts as present only when every supported kind exists on
/// every supported chain and none of its triggers on those chains is disabled.
pub fn check_accounts_presence(
    storage: &UserStorageTriggers,
    accounts: &[String],
) -> IndexMap<String, bool> {
    accounts
        .iter()
        .map(|account| {
            let account = account.to_lowercase();
            let present = is_account_enabled(storage, &account);
            (account, present)
        })
        .collect()
}

fn is_account_enabled(storage: &UserStorageTriggers, account: &str) -> bool {
    let Some(chains) = storage.account(account) else {
        return false;
    };

    for kind in TriggerKind::ALL {
        for chain in kind.supported_chains() {
            let Some(triggers) = chains.get(*chain) else {
                return false;
            };
            if !triggers.values().any(|t| t.kind == kind.as_str()) {
                return false;
            }
            if triggers.values().any(|t| !t.enabled) {
                return false;
            }
        }
    }
    true
}

/// Whether every account in storage carries every kind of each group.
///
/// Groups start out `true` and flip to `false` as soon as one account misses
/// one of their kinds, so an empty snapshot reports all groups present.
pub fn check_triggers_presence_by_group(storage: &UserStorageTriggers) -> HashMap<TriggerGroup, bool> {
    let mut result: HashMap<TriggerGroup, bool> =
        TriggerGroup::ALL.into_iter().map(|g| (g, true)).collect();

    for (_, chains) in storage.accounts() {
        let seen: HashSet<&str> = chains
            .values()
            .flat_map(|triggers| triggers.values())
            .map(|t| t.kind.as_str())
            .collect();

        for kind in TriggerKind::ALL {
            if !seen.contains(kind.as_str()) {
                result.insert(kind.group(), false);
            }
        }
    }
    result
}
