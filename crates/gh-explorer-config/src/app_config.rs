//! Application configuration
//!
//! Configuration loaded from `.gh-explorer.toml`, with the backend URL
//! overridable through `GH_EXPLORER_API_BASE_URL`.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Environment variable overriding `api_base_url`
pub const API_BASE_URL_ENV: &str = "GH_EXPLORER_API_BASE_URL";

/// Application configuration loaded from .gh-explorer.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Base URL of the explorer backend
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// How long fetched collections stay fresh, in seconds
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    /// Retries for collection reads that fail with a server error
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between retries, in milliseconds
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

fn default_api_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    5 * 60
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay_ms() -> u64 {
    1000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            cache_ttl_secs: default_cache_ttl_secs(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

impl AppConfig {
    /// Load config from CWD first, then home directory, or use defaults
    pub fn load() -> Self {
        let config = match crate::load_config_file() {
            Some(content) => Self::parse(&content).unwrap_or_else(|e| {
                log::warn!("Failed to parse config file: {}", e);
                Self::default()
            }),
            None => {
                log::debug!("Using default app config");
                Self::default()
            }
        };

        config.with_base_url_override(env::var(API_BASE_URL_ENV).ok())
    }

    /// Parse config from TOML content
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let config = toml::from_str(content)?;
        log::info!("Loaded app config from file");
        Ok(config)
    }

    /// Replace the base URL when an override is given and non-empty
    pub fn with_base_url_override(mut self, base_url: Option<String>) -> Self {
        if let Some(url) = base_url.filter(|url| !url.trim().is_empty()) {
            log::debug!("Overriding API base URL with {}", url);
            self.api_base_url = url;
        }
        self
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
