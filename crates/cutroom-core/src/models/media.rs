use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::constants::{MP4_MIME, OCTET_STREAM_MIME, WEBM_MIME};

/// Kind of media a store handle points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn default_extension(&self) -> &'static str {
        match self {
            MediaKind::Image => "png",
            MediaKind::Audio => "mp3",
            MediaKind::Video => "mp4",
        }
    }

    /// Classify a declared MIME type by its top-level prefix.
    pub fn from_mime_prefix(mime: &str) -> Option<Self> {
        let top = mime.split('/').next()?.trim().to_ascii_lowercase();
        match top.as_str() {
            "image" => Some(MediaKind::Image),
            "audio" => Some(MediaKind::Audio),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            _ => Err(format!("Invalid media kind: {}", s)),
        }
    }
}

/// Container type as derived from payload content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeKind {
    Webm,
    Mp4,
    Unknown,
}

impl MimeKind {
    /// MIME string for a known container. `Unknown` has no MIME of its own;
    /// callers resolve it through [`MimeKind::from_extension`] first.
    pub fn mime(&self) -> Option<&'static str> {
        match self {
            MimeKind::Webm => Some(WEBM_MIME),
            MimeKind::Mp4 => Some(MP4_MIME),
            MimeKind::Unknown => None,
        }
    }

    /// Policy default for payloads the sniffer could not classify. Generic or
    /// unrecognised extensions fall back to MP4.
    pub fn from_extension(ext: &str) -> Self {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "webm" | "mkv" => MimeKind::Webm,
            _ => MimeKind::Mp4,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MimeKind::Webm => "webm",
            MimeKind::Mp4 | MimeKind::Unknown => "mp4",
        }
    }
}

impl Display for MimeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.mime().unwrap_or("unknown"))
    }
}

/// Whether a declared type is absent or a generic binary placeholder that says
/// nothing about the container.
pub fn is_generic_mime(declared: Option<&str>) -> bool {
    match declared.map(|m| m.split(';').next().unwrap_or("").trim().to_ascii_lowercase()) {
        None => true,
        Some(m) => {
            m.is_empty() || m == OCTET_STREAM_MIME || m == "binary/octet-stream" || m == "video/*"
        }
    }
}
