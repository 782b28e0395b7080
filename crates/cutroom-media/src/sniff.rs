//! Container sniffing and type healing
//!
//! Stored type tags are not trusted: upload and generation paths have written
//! payloads with missing or generic types, and decoders refuse those silently.
//! The type handed to a player is always re-derived from the first bytes.

use bytes::Bytes;
use cutroom_core::constants::{EBML_MAGIC, FTYP_BOX};
use cutroom_core::models::{is_generic_mime, MediaKind, MimeKind};

/// Detect the container from magic bytes.
pub fn sniff(data: &[u8]) -> MimeKind {
    if data.len() >= 4 && data[..4] == EBML_MAGIC {
        return MimeKind::Webm;
    }

    // ISO BMFF: 4-byte box size, then the `ftyp` box type
    if data.len() >= 8 && &data[4..8] == FTYP_BOX {
        return MimeKind::Mp4;
    }

    MimeKind::Unknown
}

/// Payload re-wrapped with the type derived from its content.
#[derive(Debug, Clone, PartialEq)]
pub struct HealedPayload {
    pub bytes: Bytes,
    pub mime: String,
    pub sniffed: MimeKind,
    /// The corrected type differs from what was declared.
    pub type_changed: bool,
}

impl HealedPayload {
    /// Extension matching the healed type.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(&self.mime)
    }
}

/// MIME string for a container, as the given kind of media.
pub fn mime_for(kind: MediaKind, container: MimeKind) -> Option<String> {
    let subtype = match container {
        MimeKind::Webm => "webm",
        MimeKind::Mp4 => "mp4",
        MimeKind::Unknown => return None,
    };
    let top = match kind {
        MediaKind::Audio => "audio",
        MediaKind::Video | MediaKind::Image => "video",
    };
    Some(format!("{}/{}", top, subtype))
}

fn mime_for_extension(kind: MediaKind, ext: Option<&str>) -> String {
    let ext = ext.unwrap_or("").trim_start_matches('.').to_ascii_lowercase();
    match (kind, ext.as_str()) {
        (MediaKind::Image, "jpg" | "jpeg") => "image/jpeg".to_string(),
        (MediaKind::Image, "webp") => "image/webp".to_string(),
        (MediaKind::Image, "gif") => "image/gif".to_string(),
        (MediaKind::Image, _) => "image/png".to_string(),
        (MediaKind::Audio, "wav") => "audio/wav".to_string(),
        (MediaKind::Audio, "ogg") => "audio/ogg".to_string(),
        (MediaKind::Audio, "m4a" | "mp4") => "audio/mp4".to_string(),
        (MediaKind::Audio, "webm") => "audio/webm".to_string(),
        (MediaKind::Audio, _) => "audio/mpeg".to_string(),
        (MediaKind::Video, other) => mime_for(MediaKind::Video, MimeKind::from_extension(other))
            .unwrap_or_else(|| cutroom_core::constants::MP4_MIME.to_string()),
    }
}

/// Extension to store a payload of the given MIME type under.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime.split(';').next().unwrap_or("").trim() {
        "video/webm" | "audio/webm" => "webm",
        "video/mp4" => "mp4",
        "audio/mp4" => "m4a",
        "audio/mpeg" => "mp3",
        "audio/wav" => "wav",
        "audio/ogg" => "ogg",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        "image/png" => "png",
        _ => "mp4",
    }
}

/// Correct the type of a payload without touching its bytes.
///
/// Precedence: a recognised container wins over any declaration; otherwise a
/// specific declared type is kept; otherwise the type follows the stored
/// extension, defaulting to MP4 for video.
pub fn heal(
    bytes: Bytes,
    declared: Option<&str>,
    extension: Option<&str>,
    kind: MediaKind,
) -> HealedPayload {
    let sniffed = sniff(&bytes);
    let declared_clean = declared.map(|m| m.split(';').next().unwrap_or("").trim().to_ascii_lowercase());

    let mime = match mime_for(kind, sniffed) {
        Some(mime) => mime,
        None if !is_generic_mime(declared) => declared_clean.clone().unwrap_or_default(),
        None => mime_for_extension(kind, extension),
    };

    let type_changed = declared_clean.as_deref() != Some(mime.as_str());
    if type_changed {
        tracing::debug!(
            declared = ?declared,
            healed = %mime,
            sniffed = %sniffed,
            size_bytes = bytes.len(),
            "Healed media type"
        );
    }

    HealedPayload {
        bytes,
        mime,
        sniffed,
        type_changed,
    }
}
