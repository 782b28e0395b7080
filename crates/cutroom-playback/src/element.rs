//! Playback element seam
//!
//! A [`MediaElement`] is one independently clocked decoder (a video element or
//! an audio element). The session drives two of them; tests drive fakes.

pub trait MediaElement: Send {
    /// Load a source, or unload with `None` to release decoder memory.
    fn set_source(&mut self, url: Option<&str>);
    fn has_source(&self) -> bool;

    fn play(&mut self);
    fn pause(&mut self);
    fn is_paused(&self) -> bool;

    /// Position in seconds.
    fn current_time(&self) -> f64;
    fn seek(&mut self, secs: f64);

    fn set_muted(&mut self, muted: bool);
    fn is_muted(&self) -> bool;
    fn set_volume(&mut self, volume: f32);
    fn volume(&self) -> f32;

    /// Known once metadata has loaded.
    fn duration(&self) -> Option<f64>;
}

/// Decoder-side audio byte counter, polled by the audio presence probe.
/// `None` means the platform does not expose one.
pub trait DecodedAudioCounter: Send + Sync {
    fn decoded_audio_bytes(&self) -> Option<u64>;
}
