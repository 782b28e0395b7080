//! Media references
//!
//! A cut record stores where its media lives as a single string. The string is
//! parsed once at the boundary into [`MediaReference`]; nothing past that point
//! inspects prefixes.
//!
//! | form | variant |
//! |------|---------|
//! | `data:<mime>;base64,<payload>` | [`MediaReference::Embedded`] |
//! | `store:<kind>/<key>` | [`MediaReference::StoreHandle`] |
//! | `http://…`, `https://…` | [`MediaReference::RemoteUrl`] |

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use super::media::MediaKind;
use crate::error::MediaError;

const DATA_PREFIX: &str = "data:";
const STORE_PREFIX: &str = "store:";

/// Indirection into the content store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreHandle {
    pub kind: MediaKind,
    pub key: String,
}

impl StoreHandle {
    pub fn new(kind: MediaKind, key: impl Into<String>) -> Self {
        Self {
            kind,
            key: key.into(),
        }
    }

    /// Extension of the stored file, lower-cased, if the key has one.
    pub fn extension(&self) -> Option<String> {
        let file = self.key.rsplit('/').next()?;
        let (_, ext) = file.rsplit_once('.')?;
        if ext.is_empty() {
            None
        } else {
            Some(ext.to_ascii_lowercase())
        }
    }
}

impl Display for StoreHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}{}/{}", STORE_PREFIX, self.kind, self.key)
    }
}

/// Where a piece of media lives. Immutable: edits mint a new reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MediaReference {
    /// Payload travels inline, base64-encoded.
    Embedded { mime: String, payload: String },
    StoreHandle(StoreHandle),
    RemoteUrl(String),
}

impl MediaReference {
    pub fn parse(raw: &str) -> Result<Self, MediaError> {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix(DATA_PREFIX) {
            let (header, payload) = rest.split_once(',').ok_or_else(|| {
                MediaError::InvalidReference("embedded payload has no data section".to_string())
            })?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| {
                    MediaError::InvalidReference(
                        "embedded payload is not base64-encoded".to_string(),
                    )
                })?
                .to_string();
            return Ok(MediaReference::Embedded {
                mime,
                payload: payload.to_string(),
            });
        }

        if let Some(rest) = raw.strip_prefix(STORE_PREFIX) {
            let (kind, key) = rest.split_once('/').ok_or_else(|| {
                MediaError::InvalidReference(format!("store handle without key: {}", raw))
            })?;
            let kind = MediaKind::from_str(kind).map_err(MediaError::InvalidReference)?;
            if key.is_empty() || key.contains("..") || key.starts_with('/') {
                return Err(MediaError::InvalidReference(format!(
                    "invalid store key: {}",
                    key
                )));
            }
            return Ok(MediaReference::StoreHandle(StoreHandle::new(kind, key)));
        }

        let lower = raw.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return Ok(MediaReference::RemoteUrl(raw.to_string()));
        }

        Err(MediaError::InvalidReference(format!(
            "unrecognised media reference: {}",
            truncate(raw, 48)
        )))
    }

    /// Build an embedded reference from raw bytes.
    pub fn embed(mime: &str, bytes: &[u8]) -> Self {
        MediaReference::Embedded {
            mime: mime.to_string(),
            payload: STANDARD.encode(bytes),
        }
    }

    pub fn store(kind: MediaKind, key: impl Into<String>) -> Self {
        MediaReference::StoreHandle(StoreHandle::new(kind, key))
    }

    pub fn as_store_handle(&self) -> Option<&StoreHandle> {
        match self {
            MediaReference::StoreHandle(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            MediaReference::Embedded { .. } => "embedded",
            MediaReference::StoreHandle(_) => "store",
            MediaReference::RemoteUrl(_) => "remote",
        }
    }
}

/// Decode the base64 section of an embedded payload.
pub fn decode_embedded(payload: &str) -> Result<Vec<u8>, MediaError> {
    STANDARD
        .decode(payload.trim())
        .map_err(|e| MediaError::InvalidReference(format!("invalid base64 payload: {}", e)))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let cut = (0..=max_len).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0);
        format!("{}...", &s[..cut])
    }
}

impl Display for MediaReference {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaReference::Embedded { mime, payload } => {
                write!(f, "{}{};base64,{}", DATA_PREFIX, mime, payload)
            }
            MediaReference::StoreHandle(handle) => write!(f, "{}", handle),
            MediaReference::RemoteUrl(url) => f.write_str(url),
        }
    }
}

impl FromStr for MediaReference {
    type Err = MediaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MediaReference::parse(s)
    }
}

impl TryFrom<String> for MediaReference {
    type Error = MediaError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        MediaReference::parse(&value)
    }
}

impl From<MediaReference> for String {
    fn from(value: MediaReference) -> Self {
        value.to_string()
    }
}
