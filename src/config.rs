use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{GatewayError, Result};

/// Runtime configuration, read from `config.toml` with per-key defaults.
/// `COMIC_ORIGIN` and `PORT` environment variables override the file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream origin serving `/info.0.json` and `/{id}/info.0.json`.
    pub origin: String,
    /// Transport timeout per upstream request, in seconds.
    pub timeout_seconds: u64,
    /// How long the latest comic stays fresh, in seconds.
    pub cache_ttl_seconds: u64,
    /// Width of the recent-id window eligible for search.
    pub search_range: u32,
    /// Maximum upstream requests in flight during one search.
    pub search_batch_size: usize,
    /// Random draws before the sampler falls back to the latest comic.
    pub sample_attempts: u32,
    /// HTTP listen port.
    pub port: u16,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Request budget per window.
    pub max_requests: u64,
    /// Window length in seconds.
    pub window_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: "https://xkcd.com".to_string(),
            timeout_seconds: 30,
            cache_ttl_seconds: 300,
            search_range: 100,
            search_batch_size: 20,
            sample_attempts: 5,
            port: 3000,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_seconds: 15 * 60,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    /// Read the file when present, fall back to defaults otherwise, then
    /// apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let contents = fs::read_to_string(path).map_err(|e| {
                GatewayError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            toml::from_str(&contents)?
        } else {
            Config::default()
        };

        if let Ok(origin) = std::env::var("COMIC_ORIGIN") {
            config.origin = origin;
        }
        if let Ok(port) = std::env::var("PORT") {
            config.port = port
                .parse()
                .map_err(|_| GatewayError::Config(format!("Invalid PORT value '{}'", port)))?;
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}
