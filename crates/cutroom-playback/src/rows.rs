//! Cut list presentation state
//!
//! Per-row UI state (selection, lock, upload and load status) for the list of
//! cuts next to the preview. Holds no media of its own.

use chrono::{DateTime, Utc};
use cutroom_core::models::{Cut, CutId, CutPatch, LoadState, VideoClipStatus};
use cutroom_core::{MediaError, MediaResult, ProjectContext};
use cutroom_media::UploadStatusUpdate;
use serde::Serialize;

const DIALOGUE_PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CutRow {
    pub cut_id: CutId,
    pub speaker: String,
    pub dialogue_preview: String,
    pub confirmed: bool,
    pub has_video: bool,
    pub has_alternate_audio: bool,
    pub upload_status: VideoClipStatus,
    pub upload_error: Option<String>,
    pub load_state: LoadState,
    pub status_changed_at: Option<DateTime<Utc>>,
}

impl CutRow {
    fn from_cut(cut: &Cut) -> Self {
        Self {
            cut_id: cut.id,
            speaker: cut.speaker.clone(),
            dialogue_preview: preview(&cut.dialogue),
            confirmed: cut.confirmed,
            has_video: cut.video_reference.is_some(),
            has_alternate_audio: cut.audio_reference.is_some(),
            upload_status: VideoClipStatus::Idle,
            upload_error: None,
            load_state: if cut.video_reference.is_some() {
                LoadState::Resolving
            } else {
                LoadState::Empty
            },
            status_changed_at: None,
        }
    }

    /// Media can be replaced (upload, regenerate, trim).
    pub fn is_editable(&self) -> bool {
        !self.confirmed && self.upload_status != VideoClipStatus::Uploading
    }
}

fn preview(dialogue: &str) -> String {
    let trimmed = dialogue.trim();
    if trimmed.chars().count() <= DIALOGUE_PREVIEW_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(DIALOGUE_PREVIEW_CHARS).collect();
        format!("{}…", cut.trim_end())
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CutList {
    rows: Vec<CutRow>,
    selected: Option<CutId>,
}

impl CutList {
    pub fn from_cuts(cuts: &[Cut]) -> Self {
        let mut list = Self::default();
        list.refresh(cuts);
        list
    }

    /// Rebuild rows from the project, keeping selection and per-row status of
    /// cuts that still exist.
    pub fn refresh(&mut self, cuts: &[Cut]) {
        let previous = std::mem::take(&mut self.rows);
        self.rows = cuts
            .iter()
            .map(|cut| {
                let mut row = CutRow::from_cut(cut);
                if let Some(old) = previous.iter().find(|old| old.cut_id == cut.id) {
                    row.upload_status = old.upload_status;
                    row.upload_error = old.upload_error.clone();
                    row.status_changed_at = old.status_changed_at;
                    if row.has_video {
                        row.load_state = old.load_state.clone();
                    }
                }
                row
            })
            .collect();

        if let Some(id) = self.selected {
            if !self.rows.iter().any(|row| row.cut_id == id) {
                self.selected = None;
            }
        }
    }

    pub fn rows(&self) -> &[CutRow] {
        &self.rows
    }

    pub fn row(&self, cut_id: CutId) -> Option<&CutRow> {
        self.rows.iter().find(|row| row.cut_id == cut_id)
    }

    fn row_mut(&mut self, cut_id: CutId) -> MediaResult<&mut CutRow> {
        self.rows
            .iter_mut()
            .find(|row| row.cut_id == cut_id)
            .ok_or_else(|| MediaError::NotFound(format!("Cut {} not found", cut_id)))
    }

    pub fn select(&mut self, cut_id: CutId) -> MediaResult<()> {
        self.row_mut(cut_id)?;
        self.selected = Some(cut_id);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&CutRow> {
        self.selected.and_then(|id| self.row(id))
    }

    /// Move the selection by `step` rows, staying within the list.
    pub fn select_relative(&mut self, step: isize) -> Option<CutId> {
        if self.rows.is_empty() {
            return None;
        }
        let current = self
            .selected
            .and_then(|id| self.rows.iter().position(|row| row.cut_id == id));
        let next = match current {
            Some(index) => {
                let last = self.rows.len() as isize - 1;
                (index as isize + step).clamp(0, last) as usize
            }
            None if step < 0 => self.rows.len() - 1,
            None => 0,
        };
        let id = self.rows[next].cut_id;
        self.selected = Some(id);
        Some(id)
    }

    /// Lock or unlock a cut's media.
    pub async fn set_confirmed(
        &mut self,
        project: &dyn ProjectContext,
        cut_id: CutId,
        confirmed: bool,
    ) -> MediaResult<()> {
        self.row_mut(cut_id)?;
        let cut = project
            .update_cut(
                cut_id,
                CutPatch {
                    confirmed: Some(confirmed),
                    ..Default::default()
                },
            )
            .await?;

        let row = self.row_mut(cut_id)?;
        row.confirmed = cut.confirmed;
        tracing::debug!(cut_id, confirmed = cut.confirmed, "Cut lock changed");
        Ok(())
    }

    pub fn apply_upload_status(&mut self, update: &UploadStatusUpdate) {
        let Ok(row) = self.row_mut(update.cut_id) else {
            return;
        };
        row.upload_status = update.status;
        row.upload_error = match update.status {
            VideoClipStatus::Error => update.message.clone(),
            _ => None,
        };
        if update.status == VideoClipStatus::Ready {
            row.has_video = true;
            row.load_state = LoadState::Resolving;
        }
        row.status_changed_at = Some(Utc::now());
    }

    pub fn set_load_state(&mut self, cut_id: CutId, state: LoadState) {
        if let Ok(row) = self.row_mut(cut_id) {
            row.load_state = state;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cutroom_core::models::{MediaKind, MediaReference, ProjectId};
    use cutroom_core::InMemoryProject;

    fn cuts() -> Vec<Cut> {
        let mut first = Cut::new(1);
        first.speaker = "Narrator".to_string();
        first.dialogue = "A very long line of dialogue that will not fit in the row".to_string();
        first.video_reference = Some(MediaReference::store(MediaKind::Video, "media/p/cut_1/video/r0001.mp4"));
        vec![first, Cut::new(2), Cut::new(3)]
    }

    #[test]
    fn rows_reflect_cuts() {
        let list = CutList::from_cuts(&cuts());
        assert_eq!(list.rows().len(), 3);

        let first = list.row(1).unwrap();
        assert!(first.has_video);
        assert_eq!(first.load_state, LoadState::Resolving);
        assert!(first.dialogue_preview.ends_with('…'));
        assert!(first.dialogue_preview.chars().count() <= DIALOGUE_PREVIEW_CHARS + 1);

        assert_eq!(list.row(2).unwrap().load_state, LoadState::Empty);
    }

    #[test]
    fn selection_moves_within_bounds() {
        let mut list = CutList::from_cuts(&cuts());
        assert_eq!(list.select_relative(1), Some(1));
        assert_eq!(list.select_relative(5), Some(3));
        assert_eq!(list.select_relative(-1), Some(2));
        assert!(list.select(9).is_err());
        assert_eq!(list.selected().unwrap().cut_id, 2);

        // Selection is dropped when the cut disappears
        list.refresh(&cuts()[..1]);
        assert!(list.selected().is_none());
    }

    #[test]
    fn upload_status_updates_row() {
        let mut list = CutList::from_cuts(&cuts());
        list.apply_upload_status(&UploadStatusUpdate {
            cut_id: 2,
            status: VideoClipStatus::Uploading,
            message: None,
        });
        assert!(!list.row(2).unwrap().is_editable());

        list.apply_upload_status(&UploadStatusUpdate {
            cut_id: 2,
            status: VideoClipStatus::Error,
            message: Some("Cut 2 is locked".to_string()),
        });
        let row = list.row(2).unwrap();
        assert_eq!(row.upload_status, VideoClipStatus::Error);
        assert_eq!(row.upload_error.as_deref(), Some("Cut 2 is locked"));
        assert!(row.status_changed_at.is_some());

        // Status survives a refresh
        list.refresh(&cuts());
        assert_eq!(list.row(2).unwrap().upload_status, VideoClipStatus::Error);
    }

    #[tokio::test]
    async fn confirm_and_unlock() {
        let project = InMemoryProject::new(ProjectId::new(), cuts());
        let mut list = CutList::from_cuts(&cuts());

        list.set_confirmed(&project, 1, true).await.unwrap();
        assert!(list.row(1).unwrap().confirmed);
        assert!(!list.row(1).unwrap().is_editable());
        assert!(project.cut(1).await.unwrap().confirmed);

        list.set_confirmed(&project, 1, false).await.unwrap();
        assert!(list.row(1).unwrap().is_editable());

        assert!(matches!(
            list.set_confirmed(&project, 42, true).await,
            Err(MediaError::NotFound(_))
        ));
    }
}
