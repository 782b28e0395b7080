//! Secondary cache for remote payloads
//!
//! Downloaded payloads are persisted in the content store under
//! `cache/{project}/cut_{cut}/{url_digest}.bin`. The most recently used ones
//! are also held in an in-process LRU, so replaying a clip does not read the
//! store again.

use bytes::Bytes;
use cutroom_core::models::{CutId, MediaKind, ProjectId, StoreHandle};
use cutroom_core::MediaResult;
use cutroom_storage::keys::remote_cache_key;
use cutroom_storage::{ContentStore, StoredObject};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct RemoteCache {
    store: Arc<dyn ContentStore>,
    project_id: ProjectId,
    recent: Mutex<LruCache<String, StoredObject>>,
}

impl RemoteCache {
    pub fn new(store: Arc<dyn ContentStore>, project_id: ProjectId, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store,
            project_id,
            recent: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn recent(&self) -> MutexGuard<'_, LruCache<String, StoredObject>> {
        self.recent.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Payloads held in memory at most.
    pub fn capacity(&self) -> usize {
        self.recent().cap().get()
    }

    /// Payloads currently held in memory.
    pub fn in_memory(&self) -> usize {
        self.recent().len()
    }

    /// Drop the in-memory copy of an entry, e.g. after its store entry was
    /// deleted. The next lookup reads the store.
    pub fn invalidate(&self, cut_id: CutId, url: &str) {
        let key = remote_cache_key(self.project_id, cut_id, url);
        self.recent().pop(&key);
    }

    pub async fn get(
        &self,
        kind: MediaKind,
        cut_id: CutId,
        url: &str,
    ) -> MediaResult<Option<StoredObject>> {
        let key = remote_cache_key(self.project_id, cut_id, url);
        if let Some(object) = self.recent().get(&key).cloned() {
            tracing::debug!(cut_id, key = %key, "Remote cache hit (memory)");
            return Ok(Some(object));
        }

        let object = self.store.get(&StoreHandle::new(kind, key.as_str())).await?;
        if let Some(object) = &object {
            self.recent().put(key.clone(), object.clone());
            tracing::debug!(cut_id, key = %key, "Remote cache hit (store)");
        }
        Ok(object)
    }

    pub async fn put(
        &self,
        kind: MediaKind,
        cut_id: CutId,
        url: &str,
        bytes: Bytes,
        content_type: Option<&str>,
    ) -> MediaResult<StoreHandle> {
        let key = remote_cache_key(self.project_id, cut_id, url);
        let handle = self
            .store
            .put(kind, &key, bytes.clone().into(), content_type)
            .await?;
        self.recent().put(
            key,
            StoredObject {
                bytes,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(handle)
    }
}
