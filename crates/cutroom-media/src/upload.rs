//! Manual upload ingestion

use bytes::Bytes;
use cutroom_core::constants::DEFAULT_VIDEO_EXTENSION;
use cutroom_core::models::{
    CutId, CutPatch, MediaKind, MediaReference, MimeKind, StoreHandle, VideoClipStatus,
};
use cutroom_core::{MediaError, MediaResult, ProjectContext};
use cutroom_storage::keys::{normalize_extension, put_new_revision};
use cutroom_storage::ContentStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::blob::BlobRegistry;
use crate::sniff::heal;

/// A file handed over by the user.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Bytes,
    pub declared_mime: Option<String>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
            declared_mime: None,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.declared_mime = Some(mime.into());
        self
    }

    /// Extension taken from the file name, or the default video extension.
    pub fn extension(&self) -> String {
        match self.file_name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
            _ => DEFAULT_VIDEO_EXTENSION.to_string(),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.declared_mime
            .as_deref()
            .and_then(MediaKind::from_mime_prefix)
            .unwrap_or(MediaKind::Video)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UploadStatusUpdate {
    pub cut_id: CutId,
    pub status: VideoClipStatus,
    pub message: Option<String>,
}

#[derive(Debug, Default)]
pub struct BatchUploadReport {
    pub stored: BTreeMap<CutId, StoreHandle>,
    pub failed: BTreeMap<CutId, String>,
    pub aborted: bool,
}

pub struct UploadIngest {
    store: Arc<dyn ContentStore>,
    blobs: Option<Arc<BlobRegistry>>,
}

impl UploadIngest {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store, blobs: None }
    }

    /// Revoke handles issued for a cut once its media is replaced.
    pub fn with_blob_registry(mut self, blobs: Arc<BlobRegistry>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Store an uploaded file as the cut's media and point the cut at it.
    #[tracing::instrument(skip(self, project, file), fields(file_name = %file.file_name))]
    pub async fn ingest(
        &self,
        project: &dyn ProjectContext,
        cut_id: CutId,
        file: UploadFile,
    ) -> MediaResult<StoreHandle> {
        let cut = project
            .cut(cut_id)
            .await
            .ok_or_else(|| MediaError::NotFound(format!("Cut {} not found", cut_id)))?;
        cut.ensure_media_editable()?;

        if file.bytes.is_empty() {
            return Err(MediaError::InvalidInput(format!(
                "{} is empty",
                file.file_name
            )));
        }

        let kind = file.kind();
        let extension = file.extension();
        let healed = heal(
            file.bytes,
            file.declared_mime.as_deref(),
            Some(extension.as_str()),
            kind,
        );

        // A recognised container decides the extension; otherwise keep the file's own.
        let extension = if healed.sniffed == MimeKind::Unknown {
            normalize_extension(kind, Some(extension.as_str()))
        } else {
            healed.extension().to_string()
        };

        let size = healed.bytes.len();
        let handle = put_new_revision(
            self.store.as_ref(),
            project.project_id(),
            cut_id,
            kind,
            &extension,
            healed.bytes.into(),
            Some(healed.mime.as_str()),
        )
        .await?;

        let reference = Some(MediaReference::StoreHandle(handle.clone()));
        let patch = match kind {
            MediaKind::Video => CutPatch {
                video_reference: Some(reference),
                ..Default::default()
            },
            MediaKind::Audio => CutPatch {
                audio_reference: Some(reference),
                ..Default::default()
            },
            MediaKind::Image => CutPatch {
                image_reference: Some(reference),
                ..Default::default()
            },
        };
        project.update_cut(cut_id, patch).await?;

        if let Some(blobs) = &self.blobs {
            blobs.revoke_for_cut(cut_id);
        }

        tracing::info!(
            cut_id,
            key = %handle.key,
            kind = %kind,
            mime = %healed.mime,
            size_bytes = size,
            "Upload stored"
        );

        Ok(handle)
    }

    /// Ingest several uploads. One failing item never stops the others, except
    /// for quota/authorization failures which abort the rest.
    pub async fn ingest_batch(
        &self,
        project: &dyn ProjectContext,
        uploads: Vec<(CutId, UploadFile)>,
        status: Option<&mpsc::UnboundedSender<UploadStatusUpdate>>,
    ) -> BatchUploadReport {
        let mut report = BatchUploadReport::default();
        let publish = |cut_id: CutId, status_value: VideoClipStatus, message: Option<String>| {
            if let Some(tx) = status {
                let _ = tx.send(UploadStatusUpdate {
                    cut_id,
                    status: status_value,
                    message,
                });
            }
        };

        for (cut_id, file) in uploads {
            publish(cut_id, VideoClipStatus::Uploading, None);

            match self.ingest(project, cut_id, file).await {
                Ok(handle) => {
                    publish(cut_id, VideoClipStatus::Ready, None);
                    report.stored.insert(cut_id, handle);
                }
                Err(e) => {
                    tracing::warn!(cut_id, error = %e, "Upload failed");
                    publish(cut_id, VideoClipStatus::Error, Some(e.to_string()));
                    report.failed.insert(cut_id, e.to_string());
                    if e.is_circuit_breaker() {
                        report.aborted = true;
                        break;
                    }
                }
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutroom_core::models::{Cut, ProjectId};
    use cutroom_core::InMemoryProject;
    use cutroom_storage::MemoryStore;

    const WEBM: &[u8] = &[0x1A, 0x45, 0xDF, 0xA3, 0x42, 0x86, 0x81, 0x01];

    fn project(cuts: Vec<Cut>) -> InMemoryProject {
        InMemoryProject::new(ProjectId::new(), cuts)
    }

    #[test]
    fn extension_from_file_name() {
        assert_eq!(UploadFile::new("cut_007.WEBM", WEBM).extension(), "webm");
        assert_eq!(UploadFile::new("clip", WEBM).extension(), "mp4");
        assert_eq!(UploadFile::new(".hidden", WEBM).extension(), "mp4");
    }

    #[test]
    fn kind_from_mime_prefix() {
        assert_eq!(UploadFile::new("a", WEBM).kind(), MediaKind::Video);
        assert_eq!(
            UploadFile::new("a", WEBM).with_mime("audio/mpeg").kind(),
            MediaKind::Audio
        );
        assert_eq!(
            UploadFile::new("a", WEBM)
                .with_mime("application/octet-stream")
                .kind(),
            MediaKind::Video
        );
    }

    #[tokio::test]
    async fn upload_points_cut_at_new_key() {
        let store: Arc<dyn ContentStore> = Arc::new(MemoryStore::new());
        let project = project(vec![Cut::new(7)]);
        let ingest = UploadIngest::new(store.clone());

        let handle = ingest
            .ingest(
                &project,
                7,
                UploadFile::new("cut_007.webm", WEBM).with_mime("application/octet-stream"),
            )
            .await
            .unwrap();

        assert!(handle.key.ends_with("/cut_7/video/r0001.webm"));
        let cut = project.cut(7).await.unwrap();
        assert_eq!(
            cut.video_reference,
            Some(MediaReference::StoreHandle(handle.clone()))
        );
        let stored = store.get(&handle).await.unwrap().unwrap();
        assert_eq!(stored.content_type.as_deref(), Some("video/webm"));
    }

    #[tokio::test]
    async fn concurrent_uploads_never_share_a_key() {
        let dir = tempfile::tempdir().unwrap();
        let store: Arc<dyn ContentStore> =
            Arc::new(cutroom_storage::LocalStore::new(dir.path()).await.unwrap());
        let project = project(vec![Cut::new(1)]);
        let ingest = UploadIngest::new(store.clone());

        let (a, b) = tokio::join!(
            ingest.ingest(&project, 1, UploadFile::new("a.webm", WEBM)),
            ingest.ingest(&project, 1, UploadFile::new("b.webm", WEBM)),
        );
        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.key, b.key);

        let mut keys = store.keys_matching(&|_: &str| true).await.unwrap();
        keys.sort();
        assert_eq!(keys.len(), 2);
        assert!(keys[0].ends_with("/cut_1/video/r0001.webm"));
        assert!(keys[1].ends_with("/cut_1/video/r0002.webm"));

        let current = project.cut(1).await.unwrap().video_reference;
        assert!(
            current == Some(MediaReference::StoreHandle(a))
                || current == Some(MediaReference::StoreHandle(b))
        );
    }

    #[tokio::test]
    async fn confirmed_cut_is_locked() {
        let store: Arc<dyn ContentStore> = Arc::new(MemoryStore::new());
        let mut cut = Cut::new(1);
        cut.confirmed = true;
        let project = project(vec![cut]);

        let result = UploadIngest::new(store.clone())
            .ingest(&project, 1, UploadFile::new("a.webm", WEBM))
            .await;
        assert!(matches!(result, Err(MediaError::Locked(1))));
        assert!(store.keys_matching(&|_: &str| true).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn batch_isolates_failures_and_reports_status() {
        let store: Arc<dyn ContentStore> = Arc::new(MemoryStore::new());
        let mut locked = Cut::new(2);
        locked.confirmed = true;
        let project = project(vec![Cut::new(1), locked, Cut::new(3)]);
        let (tx, mut rx) = mpsc::unbounded_channel();

        let report = UploadIngest::new(store)
            .ingest_batch(
                &project,
                vec![
                    (1, UploadFile::new("a.webm", WEBM)),
                    (2, UploadFile::new("b.webm", WEBM)),
                    (3, UploadFile::new("c.webm", WEBM)),
                ],
                Some(&tx),
            )
            .await;

        assert_eq!(report.stored.len(), 2);
        assert!(report.failed.contains_key(&2));
        assert!(!report.aborted);

        let mut statuses = Vec::new();
        while let Ok(update) = rx.try_recv() {
            statuses.push((update.cut_id, update.status));
        }
        assert_eq!(
            statuses,
            vec![
                (1, VideoClipStatus::Uploading),
                (1, VideoClipStatus::Ready),
                (2, VideoClipStatus::Uploading),
                (2, VideoClipStatus::Error),
                (3, VideoClipStatus::Uploading),
                (3, VideoClipStatus::Ready),
            ]
        );
    }
}
