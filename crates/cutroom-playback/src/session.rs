//! Synchronized preview session
//!
//! One session per open preview. It owns the video element (primary), the
//! alternate voice element (secondary), every handle it resolved, and the
//! cancellation token of its in-flight work. The host calls
//! [`PreviewSession::on_time_update`] on every time-update event of either
//! element; all synchronization decisions happen there.
//!
//! Rules enforced here:
//! - exactly one of the two elements is unmuted, picked by the audio source
//! - the secondary element is re-seeked whenever it drifts past the threshold
//! - with the alternate track selected, a loop lasts as long as the longer of
//!   the video trim and the voice track; the video holds its last trimmed
//!   frame until the voice track finishes

use cutroom_core::constants::SILENT_VOLUME;
use cutroom_core::models::{
    AudioSourceSelection, Cut, CutId, CutPatch, DurationMaster, LoadState, MediaReference,
    TrimWindow, VolumeMap,
};
use cutroom_core::{ErrorMetadata, MediaError, MediaResult, PlaybackConfig, ProjectContext};
use cutroom_media::{ReferenceResolver, ResolveOptions, ResolvedResource};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::element::{DecodedAudioCounter, MediaElement};
use crate::probe::{spawn_audio_presence_probe, AudioPresence};

/// Slack for container durations that differ from the stored trim end by
/// rounding.
const TRIM_END_TOLERANCE_SECS: f64 = 0.05;

/// What one time-update tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TickOutcome {
    /// Not playing.
    Idle,
    Playing,
    /// The secondary element was re-seeked to the expected offset.
    DriftCorrected,
    /// The video is held on its last trimmed frame while the voice track runs.
    Frozen,
    /// Both elements restarted from the trim start.
    Looped,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaybackState {
    pub playing: bool,
    pub frozen: bool,
    pub trim_window: TrimWindow,
    pub audio_source: AudioSourceSelection,
    pub volumes: VolumeMap,
    pub duration_master: DurationMaster,
    pub video_duration: Option<f64>,
    pub alternate_duration: Option<f64>,
    pub video_state: LoadState,
    pub alternate_state: LoadState,
}

/// Presentation state for a failed resolve.
pub fn load_state_for_error(error: &MediaError) -> LoadState {
    LoadState::Failed {
        code: error.error_code().to_string(),
        message: error.client_message(),
    }
}

pub struct PreviewSession {
    cut_id: CutId,
    confirmed: bool,
    saved_trim: TrimWindow,
    video_reference: Option<MediaReference>,
    audio_reference: Option<MediaReference>,
    config: PlaybackConfig,
    primary: Box<dyn MediaElement>,
    secondary: Box<dyn MediaElement>,
    state: PlaybackState,
    cancel: CancellationToken,
    handles: Vec<ResolvedResource>,
    probe: Option<JoinHandle<()>>,
    closed: bool,
}

impl PreviewSession {
    pub fn open(
        cut: &Cut,
        primary: Box<dyn MediaElement>,
        secondary: Box<dyn MediaElement>,
        config: PlaybackConfig,
    ) -> Self {
        let mut session = Self {
            cut_id: cut.id,
            confirmed: cut.confirmed,
            saved_trim: cut.trim_window,
            video_reference: cut.video_reference.clone(),
            audio_reference: cut.audio_reference.clone(),
            config,
            primary,
            secondary,
            state: PlaybackState {
                playing: false,
                frozen: false,
                trim_window: cut.trim_window,
                audio_source: cut.audio_source,
                volumes: cut.volumes,
                duration_master: cut.duration_master,
                video_duration: None,
                alternate_duration: None,
                video_state: LoadState::Resolving,
                alternate_state: LoadState::Resolving,
            },
            cancel: CancellationToken::new(),
            handles: Vec::new(),
            probe: None,
            closed: false,
        };
        session.apply_audio_routing();
        session
    }

    pub fn cut_id(&self) -> CutId {
        self.cut_id
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Token of the session's in-flight work. Cancelling it from elsewhere
    /// aborts a pending mount.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn primary(&self) -> &dyn MediaElement {
        self.primary.as_ref()
    }

    pub fn secondary(&self) -> &dyn MediaElement {
        self.secondary.as_ref()
    }

    /// Resolve the cut's video and alternate track and load them.
    ///
    /// Failures are recorded in the session state; a failed video is also
    /// returned. Nothing is loaded once the session token is cancelled.
    pub async fn mount(&mut self, resolver: &ReferenceResolver) -> MediaResult<()> {
        if self.closed {
            return Err(MediaError::Cancelled);
        }

        let cancel = self.cancel.clone();
        let options = ResolveOptions::blob_for_cut(self.cut_id);
        let video_reference = self.video_reference.clone();
        let audio_reference = self.audio_reference.clone();

        let video = async {
            match &video_reference {
                Some(reference) => Some(resolver.resolve(reference, &options, &cancel).await),
                None => None,
            }
        };
        let audio = async {
            match &audio_reference {
                Some(reference) => Some(resolver.resolve(reference, &options, &cancel).await),
                None => None,
            }
        };
        let (video, audio) = futures::future::join(video, audio).await;

        // Anything resolved after cancellation is dropped, which releases it.
        if cancel.is_cancelled() || self.closed {
            return Err(MediaError::Cancelled);
        }

        let mut video_error = None;
        match video {
            None => self.state.video_state = LoadState::Empty,
            Some(Ok(resource)) => {
                self.primary.set_source(Some(resource.url()));
                self.handles.push(resource);
                self.state.video_state = LoadState::Ready;
            }
            Some(Err(e)) => {
                tracing::warn!(cut_id = self.cut_id, error = %e, "Preview video failed to resolve");
                self.state.video_state = load_state_for_error(&e);
                video_error = Some(e);
            }
        }

        match audio {
            None => self.state.alternate_state = LoadState::Empty,
            Some(Ok(resource)) => {
                self.secondary.set_source(Some(resource.url()));
                self.handles.push(resource);
                self.state.alternate_state = LoadState::Ready;
            }
            Some(Err(e)) => {
                tracing::warn!(cut_id = self.cut_id, error = %e, "Alternate track failed to resolve");
                self.state.alternate_state = load_state_for_error(&e);
            }
        }

        if self.state.audio_source == AudioSourceSelection::AlternateTrack
            && !self.secondary.has_source()
        {
            tracing::debug!(cut_id = self.cut_id, "No alternate track loaded, routing primary audio");
            self.state.audio_source = AudioSourceSelection::PrimaryTrack;
        }
        self.apply_audio_routing();

        match video_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Start polling the alternate element's decoder for audio. The probe
    /// stops when the session closes or is dropped; the receiver then sees
    /// the channel closed.
    pub fn spawn_audio_probe(
        &mut self,
        counter: Arc<dyn DecodedAudioCounter>,
    ) -> watch::Receiver<AudioPresence> {
        let every = Duration::from_millis(self.config.audio_probe_interval_ms);
        let (rx, handle) = spawn_audio_presence_probe(counter, every, self.cancel.child_token());
        if let Some(previous) = self.probe.replace(handle) {
            previous.abort();
        }
        rx
    }

    /// Video metadata arrived. A degenerate or out-of-range trim window is
    /// reset to the whole clip.
    pub fn on_metadata_loaded(&mut self, duration: f64) {
        if !(duration.is_finite() && duration > 0.0) {
            return;
        }
        self.state.video_duration = Some(duration);

        let trim = self.state.trim_window;
        let degenerate = trim.span() < self.config.min_trim_span_secs
            || trim.start < 0.0
            || trim.end <= 0.0
            || trim.start >= duration
            || trim.end > duration + TRIM_END_TOLERANCE_SECS;
        if degenerate {
            tracing::debug!(
                cut_id = self.cut_id,
                start = trim.start,
                end = trim.end,
                duration,
                "Resetting trim window to full clip"
            );
            self.state.trim_window = TrimWindow::full(duration);
        }

        self.primary.seek(self.state.trim_window.start);
    }

    pub fn on_alternate_metadata_loaded(&mut self, duration: f64) {
        if duration.is_finite() && duration > 0.0 {
            self.state.alternate_duration = Some(duration);
        }
    }

    fn alternate_active(&self) -> bool {
        self.state.audio_source == AudioSourceSelection::AlternateTrack
            && self.secondary.has_source()
    }

    fn apply_audio_routing(&mut self) {
        let alternate = self.state.audio_source == AudioSourceSelection::AlternateTrack;
        self.primary.set_muted(alternate);
        self.secondary.set_muted(!alternate);
        self.primary.set_volume(self.state.volumes.primary);
        self.secondary.set_volume(self.state.volumes.alternate);
    }

    /// Offset into the voice track that matches the video position.
    fn expected_secondary_time(&self) -> f64 {
        (self.primary.current_time() - self.state.trim_window.start).max(0.0)
    }

    /// Switch the audible track. A stored volume of ~0 for the target is
    /// restored to full so the switch is never silent.
    pub fn set_audio_source(&mut self, source: AudioSourceSelection) -> MediaResult<()> {
        if source == AudioSourceSelection::AlternateTrack && !self.secondary.has_source() {
            return Err(MediaError::InvalidInput(
                "No alternate audio track is loaded".to_string(),
            ));
        }

        self.state.audio_source = source;
        if self.state.volumes.for_source(source) <= SILENT_VOLUME {
            self.state.volumes.set_for_source(source, 1.0);
        }
        self.apply_audio_routing();

        if self.state.playing {
            match source {
                AudioSourceSelection::AlternateTrack => {
                    let expected = self.expected_secondary_time();
                    self.secondary.seek(expected);
                    self.secondary.play();
                }
                AudioSourceSelection::PrimaryTrack => self.secondary.pause(),
            }
        }
        Ok(())
    }

    pub fn set_volume(&mut self, source: AudioSourceSelection, volume: f32) {
        self.state.volumes.set_for_source(source, volume);
        self.apply_audio_routing();
    }

    pub fn set_trim_window(&mut self, trim: TrimWindow) -> MediaResult<()> {
        if self.confirmed {
            return Err(MediaError::Locked(self.cut_id));
        }
        self.state.trim_window = trim;
        self.state.frozen = false;
        Ok(())
    }

    pub fn set_duration_master(&mut self, master: DurationMaster) {
        self.state.duration_master = master;
    }

    pub fn play(&mut self) {
        if self.closed || !self.primary.has_source() {
            return;
        }

        let trim = self.state.trim_window;
        let alternate = self.alternate_active();
        let position = self.primary.current_time();

        if self.state.frozen || position < trim.start || position >= trim.end {
            self.primary.seek(trim.start);
            if alternate {
                self.secondary.seek(0.0);
            }
        } else if alternate {
            let expected = self.expected_secondary_time();
            self.secondary.seek(expected);
        }

        self.state.frozen = false;
        self.primary.play();
        if alternate {
            self.secondary.play();
        }
        self.state.playing = true;
    }

    pub fn pause(&mut self) {
        self.primary.pause();
        self.secondary.pause();
        self.state.playing = false;
    }

    fn restart_loop(&mut self, alternate: bool) {
        let start = self.state.trim_window.start;
        self.primary.seek(start);
        self.primary.play();
        if alternate {
            self.secondary.seek(0.0);
            self.secondary.play();
        }
        self.state.frozen = false;
    }

    /// Re-evaluate synchronization. Call on every time-update event.
    pub fn on_time_update(&mut self) -> TickOutcome {
        if self.closed || !self.state.playing {
            return TickOutcome::Idle;
        }

        let trim = self.state.trim_window;
        let video_len = trim.span().max(0.0);
        let alternate = self.alternate_active();

        let primary_elapsed = if self.state.frozen {
            video_len
        } else {
            self.primary.current_time() - trim.start
        };
        if primary_elapsed < -TRIM_END_TOLERANCE_SECS {
            self.primary.seek(trim.start);
            return TickOutcome::Playing;
        }

        let secondary_time = self.secondary.current_time();
        let (loop_len, elapsed) = if alternate {
            (
                video_len.max(self.state.alternate_duration.unwrap_or(0.0)),
                primary_elapsed.max(secondary_time),
            )
        } else {
            (video_len, primary_elapsed)
        };

        if elapsed >= loop_len {
            tracing::trace!(cut_id = self.cut_id, loop_len, "Preview looped");
            self.restart_loop(alternate);
            return TickOutcome::Looped;
        }

        if primary_elapsed >= video_len {
            if !self.state.frozen {
                self.primary.pause();
                self.primary.seek(trim.end);
                self.state.frozen = true;
            }
            return TickOutcome::Frozen;
        }

        if alternate {
            let expected = primary_elapsed;
            let inside_track = self
                .state
                .alternate_duration
                .map_or(true, |duration| expected < duration);
            if inside_track && (expected - secondary_time).abs() > self.config.drift_threshold_secs
            {
                tracing::trace!(
                    cut_id = self.cut_id,
                    expected,
                    actual = secondary_time,
                    "Correcting alternate track drift"
                );
                self.secondary.seek(expected);
                return TickOutcome::DriftCorrected;
            }
        }

        TickOutcome::Playing
    }

    /// Write trim, audio routing, volumes and duration master back to the cut
    /// as one update.
    pub async fn save(&mut self, project: &dyn ProjectContext) -> MediaResult<Cut> {
        let duration = self
            .state
            .video_duration
            .unwrap_or_else(|| self.state.trim_window.end.max(0.0));
        let trim = self
            .state
            .trim_window
            .clamped(duration, self.config.min_save_span_secs);

        let mut patch = CutPatch {
            audio_source: Some(self.state.audio_source),
            volumes: Some(self.state.volumes),
            duration_master: Some(self.state.duration_master),
            ..Default::default()
        };
        // Trim counts as media. A confirmed cut never sends it, even when
        // metadata validation reset the window for playback, so its audio
        // settings can still be saved.
        let send_trim = !self.confirmed && trim != self.saved_trim;
        if send_trim {
            patch.trim_window = Some(trim);
        }

        let cut = project.update_cut(self.cut_id, patch).await?;
        if send_trim || !cut.confirmed {
            self.state.trim_window = cut.trim_window;
        }
        self.saved_trim = cut.trim_window;
        self.confirmed = cut.confirmed;

        tracing::info!(
            cut_id = self.cut_id,
            start = cut.trim_window.start,
            end = cut.trim_window.end,
            audio_source = ?cut.audio_source,
            "Preview settings saved"
        );
        Ok(cut)
    }

    /// Abort in-flight work, unload both elements and release every handle.
    /// Safe to call more than once.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.cancel.cancel();

        self.primary.pause();
        self.secondary.pause();
        self.primary.set_source(None);
        self.secondary.set_source(None);

        let released = self.handles.len();
        for mut handle in self.handles.drain(..) {
            handle.release();
        }
        if let Some(probe) = self.probe.take() {
            probe.abort();
        }
        self.state.playing = false;
        self.state.frozen = false;

        tracing::debug!(cut_id = self.cut_id, released, "Preview session closed");
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.close();
    }
}
