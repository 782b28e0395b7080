//! Configuration module
//!
//! Storage, fetch and playback settings loaded from the environment (and a
//! `.env` file when present).

use std::env;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::constants::{
    AUDIO_PROBE_INTERVAL_MS, DRIFT_THRESHOLD_SECS, MIN_SAVE_SPAN_SECS, MIN_TRIM_SPAN_SECS,
    REMOTE_CACHE_CAPACITY,
};

/// Content store backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Local,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "local" => Ok(StoreBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid store backend: {}", s)),
        }
    }
}

impl Display for StoreBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StoreBackend::Memory => write!(f, "memory"),
            StoreBackend::Local => write!(f, "local"),
        }
    }
}

/// Tunables of the synchronized preview.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackConfig {
    /// Drift beyond which the alternate track is hard-seeked.
    pub drift_threshold_secs: f64,
    /// Trim windows shorter than this are reset on metadata load.
    pub min_trim_span_secs: f64,
    /// Minimum span written back by the save action.
    pub min_save_span_secs: f64,
    pub audio_probe_interval_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            drift_threshold_secs: DRIFT_THRESHOLD_SECS,
            min_trim_span_secs: MIN_TRIM_SPAN_SECS,
            min_save_span_secs: MIN_SAVE_SPAN_SECS,
            audio_probe_interval_ms: AUDIO_PROBE_INTERVAL_MS,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct StudioConfig {
    pub environment: String,
    pub store_backend: StoreBackend,
    pub store_path: Option<String>,
    pub remote_cache_capacity: usize,
    pub fetch_user_agent: String,
    pub log_json: bool,
    pub playback: PlaybackConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            store_backend: StoreBackend::Memory,
            store_path: None,
            remote_cache_capacity: REMOTE_CACHE_CAPACITY,
            fetch_user_agent: default_user_agent(),
            log_json: false,
            playback: PlaybackConfig::default(),
        }
    }
}

fn default_user_agent() -> String {
    format!("cutroom/{}", env!("CARGO_PKG_VERSION"))
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

impl StudioConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let store_backend = match env::var("CUTROOM_STORE_BACKEND") {
            Ok(value) => value.parse()?,
            Err(_) => StoreBackend::Memory,
        };

        let defaults = PlaybackConfig::default();
        let playback = PlaybackConfig {
            drift_threshold_secs: env_or(
                "CUTROOM_DRIFT_THRESHOLD_SECS",
                defaults.drift_threshold_secs,
            ),
            min_trim_span_secs: env_or("CUTROOM_MIN_TRIM_SPAN_SECS", defaults.min_trim_span_secs),
            min_save_span_secs: env_or("CUTROOM_MIN_SAVE_SPAN_SECS", defaults.min_save_span_secs),
            audio_probe_interval_ms: env_or(
                "CUTROOM_AUDIO_PROBE_INTERVAL_MS",
                defaults.audio_probe_interval_ms,
            ),
        };

        let config = StudioConfig {
            environment,
            store_backend,
            store_path: env::var("CUTROOM_STORE_PATH").ok().filter(|s| !s.is_empty()),
            remote_cache_capacity: env_or("CUTROOM_REMOTE_CACHE_CAPACITY", REMOTE_CACHE_CAPACITY),
            fetch_user_agent: env::var("CUTROOM_FETCH_USER_AGENT")
                .unwrap_or_else(|_| default_user_agent()),
            log_json: env_or("CUTROOM_LOG_JSON", false),
            playback,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.store_backend == StoreBackend::Local && self.store_path.is_none() {
            return Err(anyhow::anyhow!(
                "CUTROOM_STORE_PATH must be set when CUTROOM_STORE_BACKEND=local"
            ));
        }
        if self.remote_cache_capacity == 0 {
            return Err(anyhow::anyhow!(
                "CUTROOM_REMOTE_CACHE_CAPACITY must be greater than 0"
            ));
        }
        let p = &self.playback;
        if p.drift_threshold_secs <= 0.0
            || p.min_trim_span_secs <= 0.0
            || p.min_save_span_secs <= 0.0
        {
            return Err(anyhow::anyhow!("Playback thresholds must be positive"));
        }
        if p.audio_probe_interval_ms == 0 {
            return Err(anyhow::anyhow!(
                "CUTROOM_AUDIO_PROBE_INTERVAL_MS must be greater than 0"
            ));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        matches!(self.environment.to_lowercase().as_str(), "production" | "prod")
    }
}
