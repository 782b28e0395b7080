//! Cutroom Infrastructure Library
//!
//! Process-wide plumbing shared by every binary embedding the studio:
//! - Telemetry (tracing subscriber) initialization

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "observability-basic")]
pub use telemetry::{default_filter, init_from_config, init_telemetry, shutdown_telemetry};
