//! Cutroom Playback Library
//!
//! Synchronized preview of a cut's video and alternate voice track, the audio
//! presence probe, and per-row state of the cut list.

pub mod element;
pub mod probe;
pub mod rows;
pub mod session;

// Re-export commonly used types
pub use element::{DecodedAudioCounter, MediaElement};
pub use probe::{spawn_audio_presence_probe, AudioPresence};
pub use rows::{CutList, CutRow};
pub use session::{load_state_for_error, PlaybackState, PreviewSession, TickOutcome};
