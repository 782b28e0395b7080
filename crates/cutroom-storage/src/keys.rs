//! Shared key generation for content store backends.
//!
//! Media keys: `media/{project_id}/cut_{cut_id}/{kind}/r{revision:04}.{ext}`.
//! Remote cache keys: `cache/{project_id}/cut_{cut_id}/{url_digest}.bin`.
//!
//! Revisions only ever grow, so a write never lands on a key whose handle may
//! still be live, and repeated repair cycles leave exactly one current key per
//! cut and kind.

use cutroom_core::constants::{MEDIA_KEY_PREFIX, REMOTE_CACHE_KEY_PREFIX};
use cutroom_core::models::{CutId, MediaKind, ProjectId, StoreHandle};
use sha2::{Digest, Sha256};

use crate::traits::{ContentStore, StorageError, StorageResult, StorePayload};

/// Attempts at claiming a revision before a write gives up.
const MAX_REVISION_ATTEMPTS: u32 = 16;

/// Reject keys that could escape a filesystem root.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() || key.contains("..") || key.starts_with('/') || key.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "Storage key contains invalid characters: {}",
            key
        )));
    }
    Ok(())
}

/// Lower-case, strip dots, keep alphanumerics; empty falls back to the kind default.
pub fn normalize_extension(kind: MediaKind, ext: Option<&str>) -> String {
    let cleaned: String = ext
        .unwrap_or("")
        .trim()
        .trim_start_matches('.')
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    if cleaned.is_empty() || cleaned.len() > 8 {
        kind.default_extension().to_string()
    } else {
        cleaned
    }
}

/// Directory holding every revision of one cut's media of one kind.
pub fn cut_media_prefix(project_id: ProjectId, cut_id: CutId, kind: MediaKind) -> String {
    format!(
        "{}/{}/cut_{}/{}/",
        MEDIA_KEY_PREFIX, project_id, cut_id, kind
    )
}

/// Prefix of every media key belonging to a project.
pub fn project_media_prefix(project_id: ProjectId) -> String {
    format!("{}/{}/", MEDIA_KEY_PREFIX, project_id)
}

pub fn media_key(
    project_id: ProjectId,
    cut_id: CutId,
    kind: MediaKind,
    revision: u32,
    ext: &str,
) -> String {
    format!(
        "{}r{:04}.{}",
        cut_media_prefix(project_id, cut_id, kind),
        revision,
        normalize_extension(kind, Some(ext))
    )
}

/// Revision number encoded in a media key's file name.
pub fn parse_revision(key: &str) -> Option<u32> {
    let file = key.rsplit('/').next()?;
    let stem = file.split('.').next()?;
    stem.strip_prefix('r')?.parse().ok()
}

/// Mint the next unused media key for a cut. Revisions continue from the
/// highest one present in the store.
pub async fn mint_media_key(
    store: &dyn ContentStore,
    project_id: ProjectId,
    cut_id: CutId,
    kind: MediaKind,
    ext: &str,
) -> StorageResult<String> {
    let prefix = cut_media_prefix(project_id, cut_id, kind);
    let existing = store
        .keys_matching(&|key: &str| key.starts_with(prefix.as_str()))
        .await?;
    let next = existing
        .iter()
        .filter_map(|key| parse_revision(key))
        .max()
        .map_or(1, |latest| latest + 1);
    Ok(media_key(project_id, cut_id, kind, next, ext))
}

/// Write a payload under the cut's next free revision. The revision is
/// claimed with [`ContentStore::put_new`]; a writer that loses the race to
/// another one re-mints and tries the following revision, so no existing key
/// is ever overwritten.
pub async fn put_new_revision(
    store: &dyn ContentStore,
    project_id: ProjectId,
    cut_id: CutId,
    kind: MediaKind,
    ext: &str,
    payload: StorePayload,
    content_type: Option<&str>,
) -> StorageResult<StoreHandle> {
    for attempt in 1..=MAX_REVISION_ATTEMPTS {
        let key = mint_media_key(store, project_id, cut_id, kind, ext).await?;
        match store
            .put_new(kind, &key, payload.clone(), content_type)
            .await
        {
            Err(StorageError::AlreadyExists(_)) => {
                tracing::debug!(cut_id, key = %key, attempt, "Revision taken, minting the next one");
            }
            result => return result,
        }
    }

    Err(StorageError::WriteFailed(format!(
        "No free revision for cut {} after {} attempts",
        cut_id, MAX_REVISION_ATTEMPTS
    )))
}

/// Key of the cached copy of a remote payload.
pub fn remote_cache_key(project_id: ProjectId, cut_id: CutId, url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let digest = hex::encode(&digest[..8]);
    format!(
        "{}/{}/cut_{}/{}.bin",
        REMOTE_CACHE_KEY_PREFIX, project_id, cut_id, digest
    )
}

/// Whether a key names the given cut, in the current layout or in one of the
/// older flat layouts (`..._cut7_video.mp4`, `cut_7-video.webm`).
pub fn key_mentions_cut(key: &str, cut_id: CutId) -> bool {
    let id = cut_id.to_string();
    ["cut_", "cut"].iter().any(|marker| {
        let needle = format!("{}{}", marker, id);
        key.match_indices(needle.as_str()).any(|(pos, _)| {
            let after = key[pos + needle.len()..].chars().next();
            !after.is_some_and(|c| c.is_ascii_digit())
        })
    })
}
