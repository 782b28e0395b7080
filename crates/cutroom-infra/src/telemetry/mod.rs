//! Tracing subscriber initialization
//!
//! Log level comes from `RUST_LOG` when set, `cutroom=debug` otherwise.

mod init;

pub use init::{default_filter, init_from_config, init_telemetry, shutdown_telemetry};
