//! Reference resolution
//!
//! Turns a [`MediaReference`] into something a player can load. Store and
//! remote payloads always go through [`heal`] and come back as owned blob
//! handles; embedded payloads and uncached remote URLs may pass through as-is.
//!
//! Every path takes a [`CancellationToken`]. The token is checked after each
//! suspension point and before any side effect, so a superseded resolve never
//! allocates a handle or writes the cache.

use bytes::Bytes;
use cutroom_core::constants::REMOTE_CACHE_CAPACITY;
use cutroom_core::models::{decode_embedded, CutId, MediaKind, MediaReference, ProjectId};
use cutroom_core::{MediaError, MediaResult, StudioConfig};
use cutroom_storage::ContentStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::blob::BlobRegistry;
use crate::cache::RemoteCache;
use crate::ensure_not_cancelled;
use crate::fetch::{HttpFetcher, ProgressSender, RemoteFetcher};
use crate::resource::ResolvedResource;
use crate::sniff::heal;

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Materialize as a blob handle even when the reference could pass through.
    pub as_blob: bool,
    /// Cut the resource belongs to. Enables the remote cache and tags blob
    /// handles so a repair can invalidate them.
    pub cut_id: Option<CutId>,
    pub progress: Option<ProgressSender>,
}

impl ResolveOptions {
    pub fn blob_for_cut(cut_id: CutId) -> Self {
        Self {
            as_blob: true,
            cut_id: Some(cut_id),
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: ProgressSender) -> Self {
        self.progress = Some(progress);
        self
    }
}

/// Undecoded bytes of a reference with whatever type hints came with them.
#[derive(Debug, Clone)]
pub struct RawPayload {
    pub bytes: Bytes,
    pub declared: Option<String>,
    pub extension: Option<String>,
    pub kind: MediaKind,
}

pub struct ReferenceResolver {
    store: Arc<dyn ContentStore>,
    fetcher: Arc<dyn RemoteFetcher>,
    blobs: Arc<BlobRegistry>,
    cache: RemoteCache,
    project_id: ProjectId,
}

impl ReferenceResolver {
    pub fn new(
        store: Arc<dyn ContentStore>,
        fetcher: Arc<dyn RemoteFetcher>,
        project_id: ProjectId,
    ) -> Self {
        let cache = RemoteCache::new(store.clone(), project_id, REMOTE_CACHE_CAPACITY);
        Self {
            store,
            fetcher,
            blobs: BlobRegistry::new(),
            cache,
            project_id,
        }
    }

    /// Resolver for a project with the HTTP fetcher and remote cache size
    /// taken from configuration.
    pub fn from_config(
        config: &StudioConfig,
        store: Arc<dyn ContentStore>,
        project_id: ProjectId,
    ) -> MediaResult<Self> {
        let fetcher = HttpFetcher::new(&config.fetch_user_agent)?;
        tracing::debug!(
            project_id = %project_id,
            user_agent = %config.fetch_user_agent,
            cache_capacity = config.remote_cache_capacity,
            "Creating reference resolver"
        );
        Ok(Self::new(store, Arc::new(fetcher), project_id)
            .with_cache_capacity(config.remote_cache_capacity))
    }

    /// Share a blob registry with other resolvers or sessions.
    pub fn with_blob_registry(mut self, blobs: Arc<BlobRegistry>) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = RemoteCache::new(self.store.clone(), self.project_id, capacity);
        self
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn blobs(&self) -> &Arc<BlobRegistry> {
        &self.blobs
    }

    pub fn project_id(&self) -> ProjectId {
        self.project_id
    }

    pub fn cache(&self) -> &RemoteCache {
        &self.cache
    }

    /// Resolve a reference into a playable resource.
    pub async fn resolve(
        &self,
        reference: &MediaReference,
        options: &ResolveOptions,
        cancel: &CancellationToken,
    ) -> MediaResult<ResolvedResource> {
        ensure_not_cancelled(cancel)?;

        match reference {
            MediaReference::Embedded { mime, .. } if !options.as_blob => {
                return Ok(ResolvedResource::PassThrough {
                    url: reference.to_string(),
                    mime: Some(mime.clone()).filter(|m| !m.is_empty()),
                });
            }
            MediaReference::RemoteUrl(url) if !options.as_blob && options.cut_id.is_none() => {
                return Ok(ResolvedResource::PassThrough {
                    url: url.clone(),
                    mime: None,
                });
            }
            _ => {}
        }

        let raw = self
            .load_raw(reference, options.cut_id, options.progress.as_ref(), cancel)
            .await?;
        ensure_not_cancelled(cancel)?;

        let healed = heal(
            raw.bytes,
            raw.declared.as_deref(),
            raw.extension.as_deref(),
            raw.kind,
        );

        let handle = self.blobs.allocate(healed.bytes, healed.mime, options.cut_id);
        tracing::debug!(
            cut_id = ?options.cut_id,
            scheme = reference.scheme(),
            url = %handle.url(),
            mime = %handle.mime(),
            size_bytes = handle.size(),
            "Reference resolved"
        );
        Ok(ResolvedResource::Blob(handle))
    }

    /// Load the raw bytes behind a reference without healing or allocating.
    ///
    /// A reference that resolves to zero bytes is data loss, reported as
    /// [`MediaError::Unavailable`] just like a missing entry.
    pub async fn load_raw(
        &self,
        reference: &MediaReference,
        cut_id: Option<CutId>,
        progress: Option<&ProgressSender>,
        cancel: &CancellationToken,
    ) -> MediaResult<RawPayload> {
        let raw = self.read_payload(reference, cut_id, progress, cancel).await?;
        if raw.bytes.is_empty() {
            tracing::warn!(
                cut_id = ?cut_id,
                scheme = reference.scheme(),
                "Media resolved to an empty payload"
            );
            return Err(MediaError::Unavailable(format!(
                "{} reference resolved to an empty payload",
                reference.scheme()
            )));
        }
        Ok(raw)
    }

    async fn read_payload(
        &self,
        reference: &MediaReference,
        cut_id: Option<CutId>,
        progress: Option<&ProgressSender>,
        cancel: &CancellationToken,
    ) -> MediaResult<RawPayload> {
        ensure_not_cancelled(cancel)?;

        match reference {
            MediaReference::Embedded { mime, payload } => {
                let bytes = decode_embedded(payload)?;
                Ok(RawPayload {
                    bytes: Bytes::from(bytes),
                    declared: Some(mime.clone()).filter(|m| !m.is_empty()),
                    extension: None,
                    kind: MediaKind::from_mime_prefix(mime).unwrap_or(MediaKind::Video),
                })
            }

            MediaReference::StoreHandle(handle) => {
                let object = self.store.get(handle).await?;
                ensure_not_cancelled(cancel)?;

                let object = object.ok_or_else(|| {
                    tracing::warn!(cut_id = ?cut_id, key = %handle.key, "Stored media missing");
                    MediaError::Unavailable(format!("{} not found in content store", handle))
                })?;

                Ok(RawPayload {
                    bytes: object.bytes,
                    declared: object.content_type,
                    extension: handle.extension(),
                    kind: handle.kind,
                })
            }

            MediaReference::RemoteUrl(url) => {
                let extension = url_extension(url);

                if let Some(cut_id) = cut_id {
                    let cached = self.cache.get(MediaKind::Video, cut_id, url).await?;
                    ensure_not_cancelled(cancel)?;
                    if let Some(object) = cached {
                        return Ok(RawPayload {
                            kind: kind_for(object.content_type.as_deref()),
                            bytes: object.bytes,
                            declared: object.content_type,
                            extension,
                        });
                    }
                }

                let fetched = self.fetcher.fetch(url, progress, cancel).await?;
                ensure_not_cancelled(cancel)?;

                let kind = kind_for(fetched.content_type.as_deref());
                // An empty body is never worth caching.
                if let Some(cut_id) = cut_id.filter(|_| !fetched.bytes.is_empty()) {
                    if let Err(e) = self
                        .cache
                        .put(
                            kind,
                            cut_id,
                            url,
                            fetched.bytes.clone(),
                            fetched.content_type.as_deref(),
                        )
                        .await
                    {
                        // The payload is still usable without a cached copy.
                        tracing::warn!(cut_id, url = %url, error = %e, "Failed to cache remote media");
                    }
                }

                Ok(RawPayload {
                    bytes: fetched.bytes,
                    declared: fetched.content_type,
                    extension,
                    kind,
                })
            }
        }
    }

    /// Convert a player's refusal of a resolved resource into an error that
    /// points at the repair sweep.
    pub fn report_decode_failure(
        &self,
        cut_id: Option<CutId>,
        resource: &ResolvedResource,
        detail: &str,
    ) -> MediaError {
        tracing::warn!(
            cut_id = ?cut_id,
            url = %resource.url(),
            mime = ?resource.mime(),
            detail = %detail,
            "Player rejected resolved media"
        );
        MediaError::DecodeRejected(format!(
            "{} ({}): {}",
            resource.url(),
            resource.mime().unwrap_or("unknown type"),
            detail
        ))
    }
}

fn kind_for(content_type: Option<&str>) -> MediaKind {
    content_type
        .and_then(MediaKind::from_mime_prefix)
        .unwrap_or(MediaKind::Video)
}

/// Extension of the last path segment of a URL, ignoring query and fragment.
fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next()?;
    let path = path.split_once("://").map_or(path, |(_, rest)| rest);
    let (_, segment) = path.rsplit_once('/')?;
    let (_, ext) = segment.rsplit_once('.')?;
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_ascii_lowercase())
    }
}
