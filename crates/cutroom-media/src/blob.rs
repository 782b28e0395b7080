//! Locally allocated playable handles
//!
//! A [`BlobHandle`] is the process-local equivalent of an object URL: it keeps a
//! decoded payload resident until released. Handles release themselves on
//! drop, so an owner that forgets to call [`BlobHandle::release`] still cannot
//! leak. The registry counts allocations and revocations so leak-freedom can be
//! asserted.

use bytes::Bytes;
use cutroom_core::constants::BLOB_URL_SCHEME;
use cutroom_core::models::CutId;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use uuid::Uuid;

struct BlobEntry {
    bytes: Bytes,
    mime: String,
    cut_id: Option<CutId>,
}

/// Allocation counters of a registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobStats {
    pub allocated: u64,
    pub revoked: u64,
    pub live: usize,
}

#[derive(Default)]
pub struct BlobRegistry {
    entries: Mutex<HashMap<String, BlobEntry>>,
    allocated: AtomicU64,
    revoked: AtomicU64,
}

impl BlobRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, BlobEntry>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Allocate a handle for `bytes` typed as `mime`.
    pub fn allocate(
        self: &Arc<Self>,
        bytes: Bytes,
        mime: impl Into<String>,
        cut_id: Option<CutId>,
    ) -> BlobHandle {
        let url = format!("{}{}", BLOB_URL_SCHEME, Uuid::new_v4());
        let mime = mime.into();
        let size = bytes.len();

        self.entries().insert(
            url.clone(),
            BlobEntry {
                bytes,
                mime: mime.clone(),
                cut_id,
            },
        );
        self.allocated.fetch_add(1, Ordering::Relaxed);

        tracing::trace!(url = %url, mime = %mime, size_bytes = size, "Blob allocated");

        BlobHandle {
            url,
            mime,
            size,
            cut_id,
            registry: Arc::clone(self),
            released: false,
        }
    }

    /// Payload behind a live handle URL.
    pub fn read(&self, url: &str) -> Option<(Bytes, String)> {
        self.entries()
            .get(url)
            .map(|entry| (entry.bytes.clone(), entry.mime.clone()))
    }

    pub fn is_live(&self, url: &str) -> bool {
        self.entries().contains_key(url)
    }

    /// Revoke a handle URL. Returns whether it was live.
    pub fn revoke(&self, url: &str) -> bool {
        let removed = self.entries().remove(url).is_some();
        if removed {
            self.revoked.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(url = %url, "Blob revoked");
        }
        removed
    }

    /// Revoke every live handle issued for a cut, so players holding one of
    /// them must re-resolve. Returns the number revoked.
    pub fn revoke_for_cut(&self, cut_id: CutId) -> usize {
        let urls: Vec<String> = self
            .entries()
            .iter()
            .filter(|(_, entry)| entry.cut_id == Some(cut_id))
            .map(|(url, _)| url.clone())
            .collect();
        urls.iter().filter(|url| self.revoke(url)).count()
    }

    pub fn stats(&self) -> BlobStats {
        BlobStats {
            allocated: self.allocated.load(Ordering::Relaxed),
            revoked: self.revoked.load(Ordering::Relaxed),
            live: self.entries().len(),
        }
    }

    pub fn live_count(&self) -> usize {
        self.entries().len()
    }
}

/// Owned handle to an allocated blob.
pub struct BlobHandle {
    url: String,
    mime: String,
    size: usize,
    cut_id: Option<CutId>,
    registry: Arc<BlobRegistry>,
    released: bool,
}

impl BlobHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn cut_id(&self) -> Option<CutId> {
        self.cut_id
    }

    /// Whether the registry still serves this handle. False after release or
    /// after the cut's handles were invalidated by a repair.
    pub fn is_live(&self) -> bool {
        !self.released && self.registry.is_live(&self.url)
    }

    /// Release the handle. Calling it more than once is a no-op.
    pub fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.revoke(&self.url);
        }
    }
}

impl std::fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobHandle")
            .field("url", &self.url)
            .field("mime", &self.mime)
            .field("size", &self.size)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for BlobHandle {
    fn drop(&mut self) {
        self.release();
    }
}
