//! Application-wide constants.

/// MIME type of the open media container (EBML / Matroska family).
pub const WEBM_MIME: &str = "video/webm";

/// MIME type of the ISO base media container.
pub const MP4_MIME: &str = "video/mp4";

/// Placeholder type that upstream upload and generation paths used to attach
/// when they did not know what they were writing.
pub const OCTET_STREAM_MIME: &str = "application/octet-stream";

/// EBML header magic (`1A 45 DF A3`).
pub const EBML_MAGIC: [u8; 4] = [0x1A, 0x45, 0xDF, 0xA3];

/// Box type found at byte offset 4 of an ISO base media file.
pub const FTYP_BOX: &[u8; 4] = b"ftyp";

/// Fallback extension for uploads whose filename carries none.
pub const DEFAULT_VIDEO_EXTENSION: &str = "mp4";

/// Prefix under which every project's media lives in the content store.
pub const MEDIA_KEY_PREFIX: &str = "media";

/// Prefix for the secondary cache of remote payloads.
pub const REMOTE_CACHE_KEY_PREFIX: &str = "cache";

/// Scheme used for locally allocated blob handles.
pub const BLOB_URL_SCHEME: &str = "blob:";

/// A trim window shorter than this is treated as uninitialised and reset to the
/// full clip duration when metadata arrives.
pub const MIN_TRIM_SPAN_SECS: f64 = 0.5;

/// Smallest span the save action will write back.
pub const MIN_SAVE_SPAN_SECS: f64 = 0.1;

/// Maximum tolerated distance between the video clock and the alternate audio
/// clock before the audio element is hard-seeked.
pub const DRIFT_THRESHOLD_SECS: f64 = 0.2;

/// Volumes at or below this are considered silent.
pub const SILENT_VOLUME: f32 = 0.01;

/// Interval between decoder byte-counter polls of the audio presence probe.
pub const AUDIO_PROBE_INTERVAL_MS: u64 = 500;

/// Number of recently used remote payloads kept in process memory.
pub const REMOTE_CACHE_CAPACITY: usize = 16;
