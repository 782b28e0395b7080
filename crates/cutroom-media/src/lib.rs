//! Cutroom Media Library
//!
//! Resolution of media references into playable handles, container sniffing
//! and type healing, upload ingestion, and the project-wide repair sweep.

pub mod blob;
pub mod cache;
pub mod fetch;
pub mod prune;
pub mod repair;
pub mod resolver;
pub mod resource;
pub mod sniff;
pub mod upload;

// Re-export commonly used types
pub use blob::{BlobHandle, BlobRegistry, BlobStats};
pub use cache::RemoteCache;
pub use fetch::{
    classify_status, FetchProgress, FetchedPayload, HttpFetcher, ProgressSender, RemoteFetcher,
};
pub use prune::prune_orphans;
pub use repair::{RepairProgress, RepairSweep};
pub use resolver::{RawPayload, ReferenceResolver, ResolveOptions};
pub use resource::ResolvedResource;
pub use sniff::{extension_for_mime, heal, mime_for, sniff, HealedPayload};
pub use upload::{BatchUploadReport, UploadFile, UploadIngest, UploadStatusUpdate};

use cutroom_core::{MediaError, MediaResult};
use tokio_util::sync::CancellationToken;

/// Fail with [`MediaError::Cancelled`] once the owner has gone away.
pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> MediaResult<()> {
    if cancel.is_cancelled() {
        Err(MediaError::Cancelled)
    } else {
        Ok(())
    }
}
