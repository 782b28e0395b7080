//! Error types module
//!
//! All media-path failures are unified under [`MediaError`]. The variants follow
//! what the user should see: data loss (`Unavailable`), transient retrieval
//! failures (`FetchFailed`), decoder refusal (`DecodeRejected`) and upstream
//! quota/auth failures that stop a batch (`QuotaOrAuth`).

use crate::models::CutId;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected conditions such as cancellations or invalid input
    Debug,
    /// Recoverable problems scoped to one item
    Warn,
    /// Unexpected failures
    Error,
}

/// Describes how an error is presented to the user.
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "MEDIA_UNAVAILABLE")
    fn error_code(&self) -> &'static str;

    /// Whether retrying the same operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Remediation hint shown next to the error
    fn suggested_action(&self) -> Option<&'static str>;

    /// User-facing message
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum MediaError {
    #[error("Media unavailable: {0}")]
    Unavailable(String),

    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Decode rejected: {0}")]
    DecodeRejected(String),

    #[error("Quota or authorization failure: {0}")]
    QuotaOrAuth(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid media reference: {0}")]
    InvalidReference(String),

    #[error("Cut {0} is confirmed and locked")]
    Locked(CutId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// A batch that hits this error should stop instead of failing every
    /// remaining item the same way.
    pub fn is_circuit_breaker(&self) -> bool {
        matches!(self, MediaError::QuotaOrAuth(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MediaError::Cancelled)
    }
}

impl From<std::io::Error> for MediaError {
    fn from(err: std::io::Error) -> Self {
        MediaError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for MediaError {
    fn from(err: serde_json::Error) -> Self {
        MediaError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, suggested_action, log_level).
fn media_error_static_metadata(
    err: &MediaError,
) -> (&'static str, bool, Option<&'static str>, LogLevel) {
    match err {
        MediaError::Unavailable(_) => (
            "MEDIA_UNAVAILABLE",
            false,
            Some("The stored data may be lost. Re-upload or regenerate this clip"),
            LogLevel::Warn,
        ),
        MediaError::FetchFailed(_) => (
            "FETCH_FAILED",
            true,
            Some("Check the connection and retry"),
            LogLevel::Warn,
        ),
        MediaError::DecodeRejected(_) => (
            "DECODE_REJECTED",
            false,
            Some("Run the media repair to re-detect the file type"),
            LogLevel::Warn,
        ),
        MediaError::QuotaOrAuth(_) => (
            "QUOTA_OR_AUTH",
            false,
            Some("Check the API key and remaining quota"),
            LogLevel::Error,
        ),
        MediaError::Cancelled => ("CANCELLED", true, None, LogLevel::Debug),
        MediaError::InvalidReference(_) => (
            "INVALID_REFERENCE",
            false,
            Some("Re-upload or regenerate this clip"),
            LogLevel::Warn,
        ),
        MediaError::Locked(_) => (
            "CUT_LOCKED",
            false,
            Some("Unlock the cut before changing its media"),
            LogLevel::Debug,
        ),
        MediaError::InvalidInput(_) => (
            "INVALID_INPUT",
            false,
            Some("Check the input and try again"),
            LogLevel::Debug,
        ),
        MediaError::NotFound(_) => (
            "NOT_FOUND",
            false,
            Some("Verify the cut exists"),
            LogLevel::Debug,
        ),
        MediaError::Storage(_) => (
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
        MediaError::Internal(_) => (
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            LogLevel::Error,
        ),
    }
}

impl ErrorMetadata for MediaError {
    fn error_code(&self) -> &'static str {
        media_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        media_error_static_metadata(self).1
    }

    fn suggested_action(&self) -> Option<&'static str> {
        media_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        media_error_static_metadata(self).3
    }

    fn client_message(&self) -> String {
        match self {
            MediaError::Unavailable(_) => "Video data not found (data may be lost)".to_string(),
            MediaError::FetchFailed(ref msg) => format!("Download failed: {}", msg),
            MediaError::DecodeRejected(_) => {
                "The player could not decode this clip".to_string()
            }
            MediaError::QuotaOrAuth(ref msg) => msg.clone(),
            MediaError::Cancelled => "Cancelled".to_string(),
            MediaError::InvalidReference(_) => "The media reference is malformed".to_string(),
            MediaError::Locked(id) => format!("Cut {} is locked", id),
            MediaError::InvalidInput(ref msg) => msg.clone(),
            MediaError::NotFound(ref msg) => msg.clone(),
            MediaError::Storage(_) => "Failed to access local storage".to_string(),
            MediaError::Internal(_) => "Internal error".to_string(),
        }
    }
}
