use async_trait::async_trait;
use cutroom_core::models::{MediaKind, StoreHandle};
use cutroom_core::StoreBackend;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::keys::validate_key;
use crate::traits::{
    ContentStore, KeyPredicate, StorageError, StorageResult, StorePayload, StoredObject,
};

/// Content store held in process memory. Keeps the declared content type of
/// every entry, including wrong ones.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn put(
        &self,
        kind: MediaKind,
        key: &str,
        payload: StorePayload,
        content_type: Option<&str>,
    ) -> StorageResult<StoreHandle> {
        validate_key(key)?;
        let (bytes, embedded_type) = payload.into_bytes()?;
        let size = bytes.len();
        let content_type = content_type.map(str::to_string).or(embedded_type);

        self.entries.write().await.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type,
            },
        );

        tracing::debug!(key = %key, kind = %kind, size_bytes = size, "Memory store put");
        Ok(StoreHandle::new(kind, key))
    }

    async fn put_new(
        &self,
        kind: MediaKind,
        key: &str,
        payload: StorePayload,
        content_type: Option<&str>,
    ) -> StorageResult<StoreHandle> {
        validate_key(key)?;
        let (bytes, embedded_type) = payload.into_bytes()?;
        let size = bytes.len();
        let content_type = content_type.map(str::to_string).or(embedded_type);

        // Check and insert under one write lock.
        let mut entries = self.entries.write().await;
        if entries.contains_key(key) {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        entries.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type,
            },
        );

        tracing::debug!(key = %key, kind = %kind, size_bytes = size, "Memory store put_new");
        Ok(StoreHandle::new(kind, key))
    }

    async fn get(&self, handle: &StoreHandle) -> StorageResult<Option<StoredObject>> {
        validate_key(&handle.key)?;
        Ok(self.entries.read().await.get(&handle.key).cloned())
    }

    async fn keys_matching(&self, predicate: KeyPredicate<'_>) -> StorageResult<Vec<String>> {
        Ok(self
            .entries
            .read()
            .await
            .keys()
            .filter(|key| predicate(key.as_str()))
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        validate_key(key)?;
        Ok(self.entries.read().await.contains_key(key))
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Memory
    }
}
