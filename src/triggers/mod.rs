//! On-chain notification trigger state.
//!
//! The snapshot type is [`UserStorageTriggers`]; everything in [`state`] and
//! [`presence`] is a pure function over it.

mod kinds;
mod models;
pub mod presence;
pub mod state;

pub use kinds::{chains, TriggerGroup, TriggerKind};
pub use models::{AccountChains, ChainTriggers, TriggerDescriptor, TriggerEntry, UserStorageTriggers};
pub use presence::{check_accounts_presence, check_triggers_presence_by_group};
pub use state::{
    all_trigger_ids, apply_enabled, diff_for_create, enabled_trigger_ids, flatten,
    infer_enabled_kinds, initialize, insert_triggers, remove_triggers, trigger_ids_for_account,
    trigger_ids_for_kinds, upsert_address_triggers, upsert_trigger_kind,
};
