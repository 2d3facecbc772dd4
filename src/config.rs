use crate::session::{SessionConfig, DEFAULT_ENDPOINT, DEFAULT_LANGUAGE};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Environment variable prefix; `DICTATE__TIMING__HEARTBEAT_TIMEOUT_MS=9000`
/// overrides `timing.heartbeat_timeout_ms`.
pub const ENV_PREFIX: &str = "DICTATE";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub transcribe: TranscribeConfig,
    pub timing: TimingConfig,
    pub audio: AudioConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscribeConfig {
    pub endpoint: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    pub heartbeat_timeout_ms: u64,
    pub finalize_grace_ms: u64,
    pub error_display_ms: u64,
    pub long_press_threshold_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub frame_ms: u64,
}

impl Config {
    /// Load from a TOML file (extension optional), layered over the built-in
    /// defaults and under `DICTATE__*` environment variables
    pub fn load(path: &str) -> Result<Self> {
        Self::build(Some(path))
    }

    /// Built-in defaults plus environment overrides
    pub fn from_env() -> Result<Self> {
        Self::build(None)
    }

    fn build(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("service.name", "dictate-stream")?
            .set_default("transcribe.endpoint", DEFAULT_ENDPOINT)?
            .set_default("transcribe.language", DEFAULT_LANGUAGE)?
            .set_default("timing.heartbeat_timeout_ms", 7000)?
            .set_default("timing.finalize_grace_ms", 500)?
            .set_default("timing.error_display_ms", 2000)?
            .set_default("timing.long_press_threshold_ms", 500)?
            .set_default("audio.sample_rate", 16000)?
            .set_default("audio.frame_ms", 100)?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        let settings = builder
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .with_context(|| match path {
                Some(path) => format!("Failed to load configuration from {}", path),
                None => "Failed to load configuration".to_string(),
            })?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Runtime settings for the dictation session core
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            endpoint: self.transcribe.endpoint.clone(),
            language: self.transcribe.language.clone(),
            heartbeat_timeout: Duration::from_millis(self.timing.heartbeat_timeout_ms),
            finalize_grace: Duration::from_millis(self.timing.finalize_grace_ms),
            error_display: Duration::from_millis(self.timing.error_display_ms),
            long_press_threshold: Duration::from_millis(self.timing.long_press_threshold_ms),
        }
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_millis(self.audio.frame_ms.max(1))
    }
}
