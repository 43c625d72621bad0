//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend base URL, the persistent storage backend and
//! the last used username.
//!
//! Configuration is stored at `~/.config/tokengate/config.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Application name used for config/cache directory paths
pub const APP_NAME: &str = "tokengate";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when nothing is configured.
const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// HTTP request timeout in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Environment variable overriding `base_url`
pub const BASE_URL_ENV: &str = "TOKENGATE_BASE_URL";

/// Where credentials stored with "remember me" are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PersistentBackend {
    /// JSON file in the cache directory
    #[default]
    File,
    /// OS keychain
    Keychain,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub last_username: Option<String>,
    pub persistent_backend: PersistentBackend,
    pub request_timeout_secs: u64,
    /// GET path fetched by the index screen
    pub index_fetch_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            last_username: None,
            persistent_backend: PersistentBackend::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            index_fetch_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")?
        } else {
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply environment overrides on top of the file values
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url.trim().to_string();
            }
        }
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_str(r#"{"last_username": "alice"}"#)
            .expect("partial config should parse");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.last_username.as_deref(), Some("alice"));
        assert_eq!(config.persistent_backend, PersistentBackend::File);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_backend_names() {
        let config: Config = serde_json::from_str(r#"{"persistent_backend": "keychain"}"#)
            .expect("backend should parse");
        assert_eq!(config.persistent_backend, PersistentBackend::Keychain);

        let json = serde_json::to_string(&Config::default()).unwrap();
        assert!(json.contains(r#""persistent_backend":"file""#));
    }
}
