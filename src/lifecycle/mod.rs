//! Trigger lifecycle: backend subscriptions kept in step with user storage.

mod manager;
mod record;

pub use manager::{LifecycleError, TriggerLifecycleManager};
pub use record::{record_key, AccountRecord, RECORD_VERSION};
