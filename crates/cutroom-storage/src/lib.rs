//! Cutroom Storage Library
//!
//! Content store abstraction and backends (in-memory and local filesystem)
//! for the large binary media a project accumulates.
//!
//! # Storage key format
//!
//! - **Media**: `media/{project_id}/cut_{cut_id}/{kind}/r{revision:04}.{ext}`
//! - **Remote cache**: `cache/{project_id}/cut_{cut_id}/{url_digest}.bin`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized in
//! the `keys` module so all backends and callers stay consistent.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use cutroom_core::StoreBackend;
pub use factory::create_store;
#[cfg(feature = "storage-local")]
pub use local::LocalStore;
pub use memory::MemoryStore;
pub use traits::{
    ContentStore, KeyPredicate, StorageError, StorageResult, StorePayload, StoredObject,
};
