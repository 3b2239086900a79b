//! notify-sync library
//!
//! Client-side engine that keeps per-user feature data in a hashed-key remote
//! store and manages on-chain notification triggers on top of it.

pub mod announcements;
pub mod config;
pub mod lifecycle;
pub mod notifications;
pub mod onchain;
pub mod triggers;
pub mod user_storage;

// Re-export commonly used types for convenience
pub use lifecycle::{LifecycleError, TriggerLifecycleManager};
pub use notifications::{Notification, NotificationsError, NotificationsService};
pub use onchain::{TriggerApi, TriggerApiClient, TriggerApiError};
pub use triggers::UserStorageTriggers;
pub use user_storage::{InMemoryUserStorage, StorageError, UserStorage, UserStorageClient};
