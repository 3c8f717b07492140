//! Application configuration management.
//!
//! This module handles loading and saving the application configuration,
//! which includes the backend base URL, request timeout, and last used
//! username.
//!
//! Configuration is stored at `~/.config/fintrack/config.json`. Environment
//! variables take precedence over the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::api::BackendClient;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "fintrack";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when nothing else is configured
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

pub const ENV_API_BASE_URL: &str = "FINTRACK_API_BASE_URL";
pub const ENV_TIMEOUT_SECS: &str = "FINTRACK_TIMEOUT_SECS";
pub const ENV_SESSION_SECRET: &str = "FINTRACK_SESSION_SECRET";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_base_url: Option<String>,
    pub request_timeout_secs: Option<u64>,
    pub last_username: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
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

    /// Backend base URL: environment, then config file, then default
    pub fn api_base_url(&self) -> String {
        self.api_base_url_with(std::env::var(ENV_API_BASE_URL).ok())
    }

    fn api_base_url_with(&self, env_value: Option<String>) -> String {
        env_value
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_base_url.clone())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string())
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout_with(std::env::var(ENV_TIMEOUT_SECS).ok())
    }

    fn request_timeout_with(&self, env_value: Option<String>) -> Duration {
        let secs = env_value
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|s| *s > 0)
            .or(self.request_timeout_secs.filter(|s| *s > 0))
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        Duration::from_secs(secs)
    }

    /// Session seal secret from the environment, if set
    pub fn session_secret(&self) -> Option<String> {
        std::env::var(ENV_SESSION_SECRET).ok().filter(|s| !s.is_empty())
    }

    /// Build the shared backend client from this configuration
    pub fn backend_client(&self) -> Result<BackendClient> {
        BackendClient::with_timeout(self.api_base_url(), self.request_timeout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_precedence() {
        let mut config = Config::default();
        assert_eq!(config.api_base_url_with(None), DEFAULT_API_BASE_URL);

        config.api_base_url = Some("https://api.example.test".to_string());
        assert_eq!(config.api_base_url_with(None), "https://api.example.test");
        assert_eq!(config.api_base_url_with(Some("  ".to_string())), "https://api.example.test");
        assert_eq!(
            config.api_base_url_with(Some("http://override:9000".to_string())),
            "http://override:9000"
        );
    }

    #[test]
    fn test_timeout_precedence() {
        let mut config = Config::default();
        assert_eq!(config.request_timeout_with(None), Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));

        config.request_timeout_secs = Some(5);
        assert_eq!(config.request_timeout_with(None), Duration::from_secs(5));
        assert_eq!(config.request_timeout_with(Some("abc".to_string())), Duration::from_secs(5));
        assert_eq!(config.request_timeout_with(Some("0".to_string())), Duration::from_secs(5));
        assert_eq!(config.request_timeout_with(Some("12".to_string())), Duration::from_secs(12));
    }

    #[test]
    fn test_config_roundtrip_json() {
        let config = Config {
            api_base_url: Some("http://localhost:8000".to_string()),
            request_timeout_secs: Some(10),
            last_username: Some("alice".to_string()),
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let back: Config = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.last_username.as_deref(), Some("alice"));

        let empty: Config = serde_json::from_str("{}").expect("deserialize empty");
        assert!(empty.api_base_url.is_none());
    }
}
