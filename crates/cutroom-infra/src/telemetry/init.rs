use cutroom_core::StudioConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "cutroom=debug";

/// Filter used when `RUST_LOG` is absent or unparsable.
pub fn default_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter())
}

/// Install the global subscriber. `json` selects one JSON object per event
/// instead of the human-readable format.
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let registry = tracing_subscriber::registry().with(env_filter());

    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }

    tracing::info!(json, "Tracing initialized");
    Ok(())
}

/// JSON output when asked for, and always in production.
pub fn init_from_config(config: &StudioConfig) -> Result<(), Box<dyn std::error::Error>> {
    init_telemetry(config.log_json || config.is_production())?;
    tracing::debug!(
        environment = %config.environment,
        store_backend = ?config.store_backend,
        "Studio configuration loaded"
    );
    Ok(())
}

pub async fn shutdown_telemetry() {
    tracing::debug!("Telemetry shutdown");
}
