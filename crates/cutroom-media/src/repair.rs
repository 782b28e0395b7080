//! Project-wide media repair sweep
//!
//! Re-reads every cut's video, re-derives its type from content, writes it under
//! a freshly minted key and points the cut at it. Minting a new key is the
//! repair: handles issued for the old key are revoked, so no player can keep
//! decoding a stale payload. Cuts are processed one at a time to bound memory.

use cutroom_core::constants::REMOTE_CACHE_KEY_PREFIX;
use cutroom_core::models::{
    AudioSourceSelection, Cut, CutId, CutPatch, MediaKind, MediaReference, ProjectId,
    RepairReport, RepairedCut, StoreHandle, VolumeMap,
};
use cutroom_core::{MediaError, MediaResult, ProjectContext};
use cutroom_storage::keys::{cut_media_prefix, key_mentions_cut, put_new_revision};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::ensure_not_cancelled;
use crate::resolver::{RawPayload, ReferenceResolver};
use crate::sniff::heal;

pub type RepairProgress = mpsc::UnboundedSender<String>;

pub struct RepairSweep {
    resolver: Arc<ReferenceResolver>,
}

impl RepairSweep {
    pub fn new(resolver: Arc<ReferenceResolver>) -> Self {
        Self { resolver }
    }

    /// Repair every cut of the project that has a video reference.
    #[tracing::instrument(skip(self, project, progress, cancel), fields(project_id = %project.project_id()))]
    pub async fn run(
        &self,
        project: &dyn ProjectContext,
        progress: Option<&RepairProgress>,
        cancel: &CancellationToken,
    ) -> RepairReport {
        let mut report = RepairReport::default();
        let cuts: Vec<Cut> = project
            .cuts()
            .await
            .into_iter()
            .filter(|cut| cut.video_reference.is_some())
            .collect();
        let total = cuts.len();

        let note = |report: &mut RepairReport, message: String| {
            if let Some(tx) = progress {
                let _ = tx.send(message.clone());
            }
            report.messages.push(message);
        };

        for (index, cut) in cuts.into_iter().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            note(
                &mut report,
                format!("Repairing cut {} ({}/{})", cut.id, index + 1, total),
            );

            if cut.confirmed {
                match reset_audio(project, &cut).await {
                    Ok(()) => note(
                        &mut report,
                        format!("Cut {} is confirmed; media left untouched", cut.id),
                    ),
                    Err(e) => {
                        tracing::warn!(cut_id = cut.id, error = %e, "Failed to reset audio of confirmed cut");
                        report.failed.insert(cut.id, e.to_string());
                    }
                }
                report.skipped_confirmed.push(cut.id);
                continue;
            }

            match self.repair_cut(project, &cut, cancel).await {
                Ok(repaired) => {
                    note(
                        &mut report,
                        format!("Cut {} repaired as {}", cut.id, repaired.healed_type),
                    );
                    report.repaired.insert(cut.id, repaired);
                }
                Err(MediaError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(cut_id = cut.id, error = %e, "Cut repair failed");
                    note(&mut report, format!("Cut {} failed: {}", cut.id, e));
                    let abort = e.is_circuit_breaker();
                    report.failed.insert(cut.id, e.to_string());
                    if abort {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        tracing::info!(
            repaired = report.count(),
            failed = report.failed.len(),
            skipped_confirmed = report.skipped_confirmed.len(),
            aborted = report.aborted,
            cancelled = report.cancelled,
            "Repair sweep finished"
        );
        let summary = report.summary();
        note(&mut report, summary);
        report
    }

    async fn repair_cut(
        &self,
        project: &dyn ProjectContext,
        cut: &Cut,
        cancel: &CancellationToken,
    ) -> MediaResult<RepairedCut> {
        let previous = cut
            .video_reference
            .clone()
            .ok_or_else(|| MediaError::Internal(format!("Cut {} has no video", cut.id)))?;
        let project_id = project.project_id();

        let (raw, recovered_by_fallback) = match self
            .resolver
            .load_raw(&previous, Some(cut.id), None, cancel)
            .await
        {
            Ok(raw) => (raw, false),
            Err(e) if falls_back(&e) => {
                tracing::debug!(cut_id = cut.id, error = %e, "Direct lookup failed, searching store");
                match self
                    .fallback_lookup(project_id, cut.id, previous.as_store_handle(), cancel)
                    .await?
                {
                    Some(raw) => (raw, true),
                    None => return Err(e),
                }
            }
            Err(e) => return Err(e),
        };
        ensure_not_cancelled(cancel)?;

        let healed = heal(
            raw.bytes,
            raw.declared.as_deref(),
            raw.extension.as_deref(),
            MediaKind::Video,
        );
        let size_bytes = healed.bytes.len();
        let handle = put_new_revision(
            self.resolver.store().as_ref(),
            project_id,
            cut.id,
            MediaKind::Video,
            healed.extension(),
            healed.bytes.into(),
            Some(healed.mime.as_str()),
        )
        .await?;
        let key = handle.key.clone();
        // An entry written but never referenced is an orphan, not a dangling reference.
        ensure_not_cancelled(cancel)?;

        let current = MediaReference::StoreHandle(handle);
        project
            .update_cut(
                cut.id,
                CutPatch {
                    video_reference: Some(Some(current.clone())),
                    audio_source: Some(AudioSourceSelection::PrimaryTrack),
                    volumes: Some(VolumeMap {
                        primary: 1.0,
                        ..cut.volumes
                    }),
                    ..Default::default()
                },
            )
            .await?;

        let revoked = self.resolver.blobs().revoke_for_cut(cut.id);
        tracing::info!(
            cut_id = cut.id,
            key = %key,
            mime = %healed.mime,
            size_bytes,
            revoked_handles = revoked,
            recovered_by_fallback,
            "Cut media re-persisted"
        );

        Ok(RepairedCut {
            previous,
            current,
            healed_type: healed.sniffed,
            size_bytes,
            recovered_by_fallback,
        })
    }

    /// Search the whole store for a payload that names the cut. Current-layout
    /// keys of this project come first, then its remote cache, then anything
    /// else mentioning the cut id (older layouts, migrated projects).
    async fn fallback_lookup(
        &self,
        project_id: ProjectId,
        cut_id: CutId,
        failed: Option<&StoreHandle>,
        cancel: &CancellationToken,
    ) -> MediaResult<Option<RawPayload>> {
        let store = self.resolver.store();
        let mut candidates = store
            .keys_matching(&|key: &str| {
                key_mentions_cut(key, cut_id) && failed.map_or(true, |h| h.key != key)
            })
            .await?;
        ensure_not_cancelled(cancel)?;

        let own_prefix = cut_media_prefix(project_id, cut_id, MediaKind::Video);
        let cache_prefix = format!("{}/{}/", REMOTE_CACHE_KEY_PREFIX, project_id);
        candidates.retain(|key| fallback_rank(key, &own_prefix, &cache_prefix).is_some());
        // Best rank first; newest (lexicographically last) key first within a rank.
        candidates.sort_by(|a, b| {
            let rank_a = fallback_rank(a, &own_prefix, &cache_prefix);
            let rank_b = fallback_rank(b, &own_prefix, &cache_prefix);
            rank_a.cmp(&rank_b).then_with(|| b.cmp(a))
        });

        for key in candidates {
            let handle = StoreHandle::new(MediaKind::Video, key.as_str());
            let object = store.get(&handle).await?;
            ensure_not_cancelled(cancel)?;

            if let Some(object) = object {
                tracing::info!(cut_id, key = %key, "Recovered media through key search");
                return Ok(Some(RawPayload {
                    bytes: object.bytes,
                    declared: object.content_type,
                    extension: handle.extension(),
                    kind: MediaKind::Video,
                }));
            }
        }

        Ok(None)
    }
}

/// Errors that mean "not found where recorded" rather than "stop".
fn falls_back(error: &MediaError) -> bool {
    matches!(
        error,
        MediaError::Unavailable(_)
            | MediaError::FetchFailed(_)
            | MediaError::InvalidInput(_)
            | MediaError::Storage(_)
    )
}

fn fallback_rank(key: &str, own_prefix: &str, cache_prefix: &str) -> Option<u8> {
    if key.starts_with(own_prefix) {
        return Some(0);
    }
    if key.starts_with(cache_prefix) {
        return Some(1);
    }
    let lower = key.to_ascii_lowercase();
    if ["audio", "image", "thumb"].iter().any(|word| lower.contains(word)) {
        return None;
    }
    Some(2)
}

/// Reset the audio routing of a cut whose media is locked.
async fn reset_audio(project: &dyn ProjectContext, cut: &Cut) -> MediaResult<()> {
    if cut.audio_source == AudioSourceSelection::PrimaryTrack && cut.volumes.primary >= 1.0 {
        return Ok(());
    }
    project
        .update_cut(
            cut.id,
            CutPatch {
                audio_source: Some(AudioSourceSelection::PrimaryTrack),
                volumes: Some(VolumeMap {
                    primary: 1.0,
                    ..cut.volumes
                }),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}
