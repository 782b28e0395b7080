use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Presentation state of a resolve. "Resolved but empty" is data loss and is
/// kept distinct from a transient loading state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum LoadState {
    Resolving,
    Ready,
    Empty,
    Failed { code: String, message: String },
}

impl LoadState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, LoadState::Resolving)
    }
}

/// Per-row status of a manual clip upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoClipStatus {
    #[default]
    Idle,
    Uploading,
    Ready,
    Error,
}

impl Display for VideoClipStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            VideoClipStatus::Idle => write!(f, "idle"),
            VideoClipStatus::Uploading => write!(f, "uploading"),
            VideoClipStatus::Ready => write!(f, "ready"),
            VideoClipStatus::Error => write!(f, "error"),
        }
    }
}
