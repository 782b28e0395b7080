//! Orphan pruning
//!
//! Repairs and uploads never overwrite, so superseded revisions accumulate.
//! Pruning removes media keys under the project prefix that no cut references.
//! It is never run by the repair sweep itself.

use cutroom_core::models::{Cut, ProjectId};
use cutroom_core::MediaResult;
use cutroom_storage::keys::project_media_prefix;
use cutroom_storage::ContentStore;
use std::collections::HashSet;

/// Delete unreferenced media of a project. Returns the deleted keys.
#[tracing::instrument(skip(store, cuts), fields(cut_count = cuts.len()))]
pub async fn prune_orphans(
    store: &dyn ContentStore,
    project_id: ProjectId,
    cuts: &[Cut],
) -> MediaResult<Vec<String>> {
    let live: HashSet<&str> = cuts
        .iter()
        .flat_map(|cut| {
            [
                cut.image_reference.as_ref(),
                cut.video_reference.as_ref(),
                cut.audio_reference.as_ref(),
            ]
        })
        .flatten()
        .filter_map(|reference| reference.as_store_handle())
        .map(|handle| handle.key.as_str())
        .collect();

    let prefix = project_media_prefix(project_id);
    let orphans = store
        .keys_matching(&|key: &str| key.starts_with(prefix.as_str()) && !live.contains(key))
        .await?;

    for key in &orphans {
        store.delete(key).await?;
    }

    tracing::info!(deleted = orphans.len(), "Pruned orphaned media");
    Ok(orphans)
}
