use async_trait::async_trait;
use bytes::Bytes;
use cutroom_core::models::{MediaKind, StoreHandle};
use cutroom_core::StoreBackend;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::keys::validate_key;
use crate::traits::{
    ContentStore, KeyPredicate, StorageError, StorageResult, StorePayload, StoredObject,
};

/// Local filesystem content store. Entries carry no type metadata; readers
/// re-derive it from content.
#[derive(Clone)]
pub struct LocalStore {
    base_path: PathBuf,
}

impl LocalStore {
    /// Create a new LocalStore rooted at `base_path`, creating the directory.
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStore { base_path })
    }

    /// Convert a storage key to a filesystem path with security validation
    fn key_to_path(&self, storage_key: &str) -> StorageResult<PathBuf> {
        validate_key(storage_key)?;

        let path = self.base_path.join(storage_key);
        if path.strip_prefix(&self.base_path).is_err() {
            return Err(StorageError::InvalidKey(
                "Storage key resolves outside storage directory".to_string(),
            ));
        }
        Ok(path)
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn path_to_key(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.base_path).ok()?;
        let parts: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    /// Write `data` to a uniquely named sibling temp file so concurrent
    /// writers of the same key never share one.
    async fn write_temp(&self, path: &Path, data: &[u8]) -> StorageResult<PathBuf> {
        let tmp_path = path.with_extension(format!("{}.partial", Uuid::new_v4().simple()));
        let mut file = fs::File::create(&tmp_path).await.map_err(|e| {
            StorageError::WriteFailed(format!(
                "Failed to create file {}: {}",
                tmp_path.display(),
                e
            ))
        })?;

        let written = async {
            file.write_all(data).await?;
            file.sync_all().await
        }
        .await;
        drop(file);

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::WriteFailed(format!(
                "Failed to write file {}: {}",
                path.display(),
                e
            )));
        }
        Ok(tmp_path)
    }
}

#[async_trait]
impl ContentStore for LocalStore {
    async fn put(
        &self,
        kind: MediaKind,
        key: &str,
        payload: StorePayload,
        _content_type: Option<&str>,
    ) -> StorageResult<StoreHandle> {
        let path = self.key_to_path(key)?;
        let (data, _) = payload.into_bytes()?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();

        // Rename over the target so readers never see a torn payload.
        let tmp_path = self.write_temp(&path, &data).await?;
        if let Err(e) = fs::rename(&tmp_path, &path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::WriteFailed(format!(
                "Failed to move file {}: {}",
                path.display(),
                e
            )));
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            kind = %kind,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local store put successful"
        );

        Ok(StoreHandle::new(kind, key))
    }

    async fn put_new(
        &self,
        kind: MediaKind,
        key: &str,
        payload: StorePayload,
        _content_type: Option<&str>,
    ) -> StorageResult<StoreHandle> {
        let path = self.key_to_path(key)?;
        let (data, _) = payload.into_bytes()?;
        let size = data.len();

        self.ensure_parent_dir(&path).await?;

        // A hard link fails atomically when the target exists, unlike rename.
        let tmp_path = self.write_temp(&path, &data).await?;
        let linked = fs::hard_link(&tmp_path, &path).await;
        let _ = fs::remove_file(&tmp_path).await;

        match linked {
            Ok(()) => {
                tracing::info!(
                    path = %path.display(),
                    key = %key,
                    kind = %kind,
                    size_bytes = size,
                    "Local store put_new successful"
                );
                Ok(StoreHandle::new(kind, key))
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(StorageError::AlreadyExists(key.to_string()))
            }
            Err(e) => Err(StorageError::WriteFailed(format!(
                "Failed to publish file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn get(&self, handle: &StoreHandle) -> StorageResult<Option<StoredObject>> {
        let path = self.key_to_path(&handle.key)?;

        match fs::read(&path).await {
            Ok(data) => {
                tracing::debug!(
                    key = %handle.key,
                    size_bytes = data.len(),
                    "Local store read"
                );
                Ok(Some(StoredObject {
                    bytes: Bytes::from(data),
                    content_type: None,
                }))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "Failed to read file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn keys_matching(&self, predicate: KeyPredicate<'_>) -> StorageResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.base_path.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                    continue;
                }
                if path.extension().is_some_and(|ext| ext == "partial") {
                    continue;
                }
                if let Some(key) = self.path_to_key(&path) {
                    if predicate(key.as_str()) {
                        keys.push(key);
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(key = %key, "Local store delete successful");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    fn backend_type(&self) -> StoreBackend {
        StoreBackend::Local
    }
}
