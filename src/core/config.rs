use crate::core::StonkieError;
use crate::stream::{FrameFormat, StreamConfig};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

include!(concat!(env!("OUT_DIR"), "/config_embedded.rs"));

const CONFIG_FILE: &str = "config.toml";
pub const BACKEND_URL_ENV: &str = "STONKIE_BACKEND_URL";
pub const SEARCH_API_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";
const DEFAULT_SEARCH_URL: &str = "https://www.alphavantage.co";

/// Frame format expected from each streaming endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct StreamFormats {
    pub analysis: FrameFormat,
    pub faq: FrameFormat,
    pub insights: FrameFormat,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub backend_url: String,
    pub connect_timeout_secs: Option<u64>,
    pub idle_timeout_secs: Option<u64>,
    #[serde(default = "default_terminator")]
    pub terminator: String,
    pub streams: StreamFormats,
    /// Base URL of the Alpha Vantage API used by ticker search.
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// Only read from the environment, never from `config.toml`.
    #[serde(skip)]
    pub search_api_key: Option<String>,
}

/// The logical streams the dashboard keeps open.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamPurpose {
    Analysis,
    Faq,
    Insights,
}

fn default_terminator() -> String {
    crate::stream::DEFAULT_TERMINATOR.to_string()
}

fn default_search_url() -> String {
    DEFAULT_SEARCH_URL.to_string()
}

/// Reads `name` from `.env` first, then from the process environment.
fn env_var(name: &str) -> Option<String> {
    dotenv::var(name).or_else(|_| std::env::var(name)).ok()
}

impl Default for Config {
    fn default() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("Invalid default config")
    }
}

impl Config {
    /// Loads `./config.toml` when present, otherwise the embedded default, then
    /// applies the `STONKIE_BACKEND_URL` override and the search API key from
    /// `.env` or the environment.
    pub fn load() -> Result<Self, StonkieError> {
        let config = Self::load_from(Path::new(CONFIG_FILE))?;
        Ok(config
            .with_backend_override(env_var(BACKEND_URL_ENV))
            .with_search_api_key(env_var(SEARCH_API_KEY_ENV)))
    }

    pub fn load_from(config_path: &Path) -> Result<Self, StonkieError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path).map_err(|e| {
                StonkieError::ConfigError(format!("Failed to read config file: {e}"))
            })?;

            toml::from_str(&contents)
                .map_err(|e| StonkieError::ConfigError(format!("Failed to parse config file: {e}")))
        } else {
            Ok(Self::default())
        }
    }

    #[must_use]
    pub fn with_backend_override(mut self, backend_url: Option<String>) -> Self {
        if let Some(url) = backend_url.filter(|url| !url.trim().is_empty()) {
            self.update_backend_url(url);
        }
        self
    }

    #[must_use]
    pub fn with_search_api_key(mut self, api_key: Option<String>) -> Self {
        if let Some(key) = api_key.filter(|key| !key.trim().is_empty()) {
            self.search_api_key = Some(key.trim().to_string());
        }
        self
    }

    pub fn update_backend_url(&mut self, backend_url: String) {
        self.backend_url = backend_url.trim_end_matches('/').to_string();
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs.map(Duration::from_secs)
    }

    pub const fn format_for(&self, purpose: StreamPurpose) -> FrameFormat {
        match purpose {
            StreamPurpose::Analysis => self.streams.analysis,
            StreamPurpose::Faq => self.streams.faq,
            StreamPurpose::Insights => self.streams.insights,
        }
    }

    /// Builds the consumer configuration for one of the dashboard streams.
    pub fn stream_config(&self, purpose: StreamPurpose) -> StreamConfig {
        StreamConfig::new(self.format_for(purpose))
            .with_terminator(self.terminator.clone())
            .with_idle_timeout(self.idle_timeout())
    }
}
