//! Hashed-key remote user storage.
//!
//! Per-user feature data lives in named collections of `{HashedKey, Data}`
//! entries. This module provides:
//! - `UserStorage`: the storage contract
//! - `UserStorageClient`: HTTP implementation against the remote service
//! - `InMemoryUserStorage`: in-process implementation with the same semantics

mod client;
mod memory;
mod models;
mod trait_def;

pub use client::UserStorageClient;
pub use memory::InMemoryUserStorage;
pub use models::{
    create_hashed_key, PutEntryBody, PutFeatureBody, StorageEntry, UserStorageFeature,
};
#[cfg(any(test, feature = "mock"))]
pub use trait_def::MockUserStorage;
pub use trait_def::{StorageError, UserStorage};
