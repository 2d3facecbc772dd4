use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "wss://api.dictate-button.io/v2/transcribe";
pub const DEFAULT_LANGUAGE: &str = "en";

/// Configuration for dictation sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Transcription service WebSocket endpoint
    pub endpoint: String,

    /// Language code sent as the `language` query parameter (empty = omit)
    pub language: String,

    /// Silence on the connection longer than this means it is gone
    /// Default: 7 seconds
    pub heartbeat_timeout: Duration,

    /// How long to wait for trailing final results after stop
    /// Default: 500 ms
    pub finalize_grace: Duration,

    /// How long the error state is held before returning to idle
    /// Default: 2 seconds
    pub error_display: Duration,

    /// Press duration that turns a tap into a long press
    pub long_press_threshold: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            heartbeat_timeout: Duration::from_millis(7000),
            finalize_grace: Duration::from_millis(500),
            error_display: Duration::from_millis(2000),
            long_press_threshold: Duration::from_millis(500),
        }
    }
}

impl SessionConfig {
    /// Endpoint with the language query parameter set, replacing any
    /// `language` parameter already present.
    pub fn endpoint_url(&self) -> Result<String> {
        let mut url = Url::parse(&self.endpoint)
            .with_context(|| format!("Invalid transcription endpoint: {}", self.endpoint))?;

        if !self.language.is_empty() {
            let kept: Vec<(String, String)> = url
                .query_pairs()
                .filter(|(key, _)| key != "language")
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect();

            url.query_pairs_mut()
                .clear()
                .extend_pairs(kept)
                .append_pair("language", &self.language);
        }

        Ok(url.to_string())
    }
}
