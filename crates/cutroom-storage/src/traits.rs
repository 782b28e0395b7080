//! Content store abstraction trait
//!
//! This module defines the trait every content store backend implements.

use async_trait::async_trait;
use bytes::Bytes;
use cutroom_core::models::{decode_embedded, MediaKind, MediaReference, StoreHandle};
use cutroom_core::{MediaError, StoreBackend};
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Key already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for MediaError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(msg) => MediaError::InvalidReference(msg),
            StorageError::InvalidPayload(msg) => MediaError::InvalidInput(msg),
            other => MediaError::Storage(other.to_string()),
        }
    }
}

/// What a caller hands to [`ContentStore::put`].
#[derive(Debug, Clone)]
pub enum StorePayload {
    Binary(Bytes),
    /// A `data:` URL or a bare base64 string.
    Embedded(String),
}

impl StorePayload {
    /// Decode into raw bytes plus the MIME type carried by a `data:` URL.
    pub fn into_bytes(self) -> StorageResult<(Bytes, Option<String>)> {
        match self {
            StorePayload::Binary(bytes) => Ok((bytes, None)),
            StorePayload::Embedded(text) => {
                let (mime, payload) = if text.trim_start().starts_with("data:") {
                    match MediaReference::parse(&text)
                        .map_err(|e| StorageError::InvalidPayload(e.to_string()))?
                    {
                        MediaReference::Embedded { mime, payload } => (Some(mime), payload),
                        other => {
                            return Err(StorageError::InvalidPayload(format!(
                                "expected embedded payload, got {} reference",
                                other.scheme()
                            )))
                        }
                    }
                } else {
                    (None, text)
                };
                let bytes = decode_embedded(&payload)
                    .map_err(|e| StorageError::InvalidPayload(e.to_string()))?;
                Ok((Bytes::from(bytes), mime.filter(|m| !m.is_empty())))
            }
        }
    }
}

impl From<Vec<u8>> for StorePayload {
    fn from(value: Vec<u8>) -> Self {
        StorePayload::Binary(Bytes::from(value))
    }
}

impl From<Bytes> for StorePayload {
    fn from(value: Bytes) -> Self {
        StorePayload::Binary(value)
    }
}

/// A payload read back from the store. `content_type` is whatever was recorded
/// at write time and may be wrong or missing for legacy entries.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

/// Predicate over store keys.
pub type KeyPredicate<'a> = &'a (dyn Fn(&str) -> bool + Send + Sync);

/// Content store abstraction trait
///
/// Keys are deterministic strings built by the `keys` module. Writes replace
/// whatever was stored under the same key, so callers mint a fresh key whenever
/// a previously issued handle may still be in use.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Write a payload under `key` and return a handle to it.
    async fn put(
        &self,
        kind: MediaKind,
        key: &str,
        payload: StorePayload,
        content_type: Option<&str>,
    ) -> StorageResult<StoreHandle>;

    /// Write a payload only if `key` is free. Fails with
    /// [`StorageError::AlreadyExists`] and leaves the stored entry untouched
    /// when another writer got there first.
    async fn put_new(
        &self,
        kind: MediaKind,
        key: &str,
        payload: StorePayload,
        content_type: Option<&str>,
    ) -> StorageResult<StoreHandle>;

    /// Read a payload. A missing key is `Ok(None)`, not an error.
    async fn get(&self, handle: &StoreHandle) -> StorageResult<Option<StoredObject>>;

    /// Every key accepted by `predicate`, sorted.
    async fn keys_matching(&self, predicate: KeyPredicate<'_>) -> StorageResult<Vec<String>>;

    /// Remove a key. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    async fn exists(&self, key: &str) -> StorageResult<bool>;

    fn backend_type(&self) -> StoreBackend;
}
