//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the API
//! server address, the public origin used when printing short links, the
//! request timeout and the last username used to sign in.
//!
//! Configuration is stored at `~/.config/shorturl/config.json`. Environment
//! variables override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/data/cache directory paths
const APP_NAME: &str = "shorturl";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Default API server (the development backend)
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Default origin that short links are served from
pub const DEFAULT_PUBLIC_URL: &str = "http://localhost:5173";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "SHORTURL_API_URL";
pub const ENV_PUBLIC_URL: &str = "SHORTURL_PUBLIC_URL";
pub const ENV_USERNAME: &str = "SHORTURL_USERNAME";
pub const ENV_PASSWORD: &str = "SHORTURL_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub public_base_url: Option<String>,
    pub last_username: Option<String>,
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Persistent storage location (credential and profile)
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    /// Log file location
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn api_base_url(&self) -> String {
        resolve(std::env::var(ENV_API_URL).ok(), self.api_base_url.as_deref(), DEFAULT_API_URL)
    }

    pub fn public_base_url(&self) -> String {
        resolve(
            std::env::var(ENV_PUBLIC_URL).ok(),
            self.public_base_url.as_deref(),
            DEFAULT_PUBLIC_URL,
        )
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }
}

/// Environment beats config file beats built-in default. Blank values are skipped.
fn resolve(env: Option<String>, configured: Option<&str>, default: &str) -> String {
    env.as_deref()
        .into_iter()
        .chain(configured)
        .map(str::trim)
        .find(|v| !v.is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}
