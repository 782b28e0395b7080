#[cfg(feature = "storage-local")]
use crate::LocalStore;
use crate::{ContentStore, MemoryStore, StorageError, StorageResult};
use cutroom_core::{StoreBackend, StudioConfig};
use std::sync::Arc;

/// Create a content store based on configuration
pub async fn create_store(config: &StudioConfig) -> StorageResult<Arc<dyn ContentStore>> {
    match config.store_backend {
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),

        #[cfg(feature = "storage-local")]
        StoreBackend::Local => {
            let base_path = config.store_path.clone().ok_or_else(|| {
                StorageError::ConfigError("CUTROOM_STORE_PATH not configured".to_string())
            })?;
            let store = LocalStore::new(base_path).await?;
            Ok(Arc::new(store))
        }

        #[cfg(not(feature = "storage-local"))]
        StoreBackend::Local => Err(StorageError::ConfigError(
            "Local store backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
