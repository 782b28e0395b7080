//! Cutroom Core Library
//!
//! Domain models, error types and configuration shared by the storage, media
//! and playback crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod project;

// Re-export commonly used types
pub use config::{PlaybackConfig, StoreBackend, StudioConfig};
pub use error::{ErrorMetadata, LogLevel, MediaError, MediaResult};
pub use project::{InMemoryProject, ProjectContext};
