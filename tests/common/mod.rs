//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::TestServer;
//!
//! #[tokio::test]
//! async fn test_storage_roundtrip() {
//!     let server = TestServer::spawn().await;
//!     let client = common::storage_client(&server);
//!     // ...
//! }
//! ```

mod fixtures;
mod server;

#[allow(unused_imports)]
pub use fixtures::*;
pub use server::TestServer;
