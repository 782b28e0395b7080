use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use uuid::Uuid;

use super::reference::MediaReference;
use crate::error::MediaError;

/// Identifier of the project whose cuts are being produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        ProjectId(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ProjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.0)
    }
}

/// Sequential cut number within a project.
pub type CutId = u32;

/// `[start, end]` sub-range of a clip, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn full(duration: f64) -> Self {
        Self {
            start: 0.0,
            end: duration.max(0.0),
        }
    }

    pub fn span(&self) -> f64 {
        self.end - self.start
    }

    /// Clamp into `[0, duration]` keeping at least `min_span` seconds.
    pub fn clamped(&self, duration: f64, min_span: f64) -> Self {
        let duration = duration.max(min_span);
        let start = if self.start.is_finite() {
            self.start.clamp(0.0, duration - min_span)
        } else {
            0.0
        };
        let floor = (start + min_span).min(duration);
        let end = if self.end.is_finite() {
            self.end.clamp(floor, duration)
        } else {
            duration
        };
        Self { start, end }
    }
}

impl Default for TrimWindow {
    fn default() -> Self {
        Self {
            start: 0.0,
            end: 0.0,
        }
    }
}

/// Which track governs a cut's effective length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationMaster {
    #[default]
    AudioDriven,
    VideoDriven,
}

/// Which of the two tracks is audible in preview and export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AudioSourceSelection {
    /// Audio embedded in the video clip.
    #[default]
    PrimaryTrack,
    /// Separately generated voice track.
    AlternateTrack,
}

/// Per-track volumes, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeMap {
    pub primary: f32,
    pub alternate: f32,
    pub background: f32,
}

impl VolumeMap {
    pub fn for_source(&self, source: AudioSourceSelection) -> f32 {
        match source {
            AudioSourceSelection::PrimaryTrack => self.primary,
            AudioSourceSelection::AlternateTrack => self.alternate,
        }
    }

    pub fn set_for_source(&mut self, source: AudioSourceSelection, volume: f32) {
        let volume = volume.clamp(0.0, 1.0);
        match source {
            AudioSourceSelection::PrimaryTrack => self.primary = volume,
            AudioSourceSelection::AlternateTrack => self.alternate = volume,
        }
    }

    pub fn clamped(&self) -> Self {
        Self {
            primary: self.primary.clamp(0.0, 1.0),
            alternate: self.alternate.clamp(0.0, 1.0),
            background: self.background.clamp(0.0, 1.0),
        }
    }
}

impl Default for VolumeMap {
    fn default() -> Self {
        Self {
            primary: 1.0,
            alternate: 1.0,
            background: 0.3,
        }
    }
}

/// One shot of the episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cut {
    pub id: CutId,
    #[serde(default)]
    pub speaker: String,
    #[serde(default)]
    pub dialogue: String,
    #[serde(default)]
    pub image_reference: Option<MediaReference>,
    #[serde(default)]
    pub video_reference: Option<MediaReference>,
    #[serde(default)]
    pub audio_reference: Option<MediaReference>,
    #[serde(default)]
    pub trim_window: TrimWindow,
    #[serde(default)]
    pub duration_master: DurationMaster,
    #[serde(default)]
    pub audio_source: AudioSourceSelection,
    #[serde(default)]
    pub volumes: VolumeMap,
    #[serde(default)]
    pub confirmed: bool,
}

impl Cut {
    pub fn new(id: CutId) -> Self {
        Self {
            id,
            speaker: String::new(),
            dialogue: String::new(),
            image_reference: None,
            video_reference: None,
            audio_reference: None,
            trim_window: TrimWindow::default(),
            duration_master: DurationMaster::default(),
            audio_source: AudioSourceSelection::default(),
            volumes: VolumeMap::default(),
            confirmed: false,
        }
    }

    /// Fails with [`MediaError::Locked`] while the cut is confirmed.
    pub fn ensure_media_editable(&self) -> Result<(), MediaError> {
        if self.confirmed {
            Err(MediaError::Locked(self.id))
        } else {
            Ok(())
        }
    }

    /// Length the cut occupies in the composition. Video-driven cuts last as
    /// long as their trim window; audio-driven cuts follow the alternate voice
    /// track when its duration is known.
    pub fn effective_duration(&self, alternate_duration: Option<f64>) -> f64 {
        let trim = self.trim_window.span().max(0.0);
        match (self.duration_master, alternate_duration) {
            (DurationMaster::AudioDriven, Some(audio)) if audio > 0.0 => audio,
            _ => trim,
        }
    }

    /// Apply a merged partial update. Media fields of a confirmed cut cannot be
    /// replaced unless the same patch unlocks it.
    pub fn apply(&mut self, patch: &CutPatch) -> Result<(), MediaError> {
        let unlocking = patch.confirmed == Some(false);
        if patch.touches_media() && self.confirmed && !unlocking {
            return Err(MediaError::Locked(self.id));
        }

        if let Some(confirmed) = patch.confirmed {
            self.confirmed = confirmed;
        }
        if let Some(ref reference) = patch.image_reference {
            self.image_reference = reference.clone();
        }
        if let Some(ref reference) = patch.video_reference {
            self.video_reference = reference.clone();
        }
        if let Some(ref reference) = patch.audio_reference {
            self.audio_reference = reference.clone();
        }
        if let Some(trim) = patch.trim_window {
            self.trim_window = trim;
        }
        if let Some(master) = patch.duration_master {
            self.duration_master = master;
        }
        if let Some(source) = patch.audio_source {
            self.audio_source = source;
        }
        if let Some(volumes) = patch.volumes {
            self.volumes = volumes.clamped();
        }
        Ok(())
    }
}

/// Partial update to one cut. `None` leaves a field untouched; for the
/// optional references `Some(None)` clears the field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CutPatch {
    pub image_reference: Option<Option<MediaReference>>,
    pub video_reference: Option<Option<MediaReference>>,
    pub audio_reference: Option<Option<MediaReference>>,
    pub trim_window: Option<TrimWindow>,
    pub duration_master: Option<DurationMaster>,
    pub audio_source: Option<AudioSourceSelection>,
    pub volumes: Option<VolumeMap>,
    pub confirmed: Option<bool>,
}

impl CutPatch {
    pub fn touches_media(&self) -> bool {
        self.image_reference.is_some()
            || self.video_reference.is_some()
            || self.audio_reference.is_some()
            || self.trim_window.is_some()
    }

    pub fn is_empty(&self) -> bool {
        *self == CutPatch::default()
    }
}
