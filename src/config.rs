use crate::aspect_ratio::MAX_CANVAS_DIMENSION;
use crate::fill_service::FillOrchestrator;
use crate::gemini_client::{GeminiClient, DEFAULT_BASE_URL, DEFAULT_MODEL};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// The only secret. Never written to the config file.
pub const API_KEY_ENV: &str = "API_KEY";
pub const MODEL_ENV: &str = "OUTPAINT_MODEL";
pub const SERVER_ADDR_ENV: &str = "OUTPAINT_SERVER_ADDR";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("API_KEY environment variable is not set")]
    MissingApiKey,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub model: String,
    /// Zero disables the timeout.
    pub request_timeout_secs: u64,
    pub max_canvas_dimension: u32,
    pub server_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 120,
            max_canvas_dimension: MAX_CANVAS_DIMENSION,
            server_addr: "127.0.0.1:3000".to_string(),
        }
    }
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("OutpaintStudio")
            .join("config.json")
    }

    pub fn load(path: &Path) -> Option<AppConfig> {
        log::debug!("Attempting to load config from: {:?}", path);
        if !path.exists() {
            log::info!("ℹ️ Config file does not exist at: {:?}", path);
            return None;
        }
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
                Ok(config) => {
                    log::info!("✅ Loaded config from {:?}", path);
                    Some(config)
                }
                Err(e) => {
                    log::error!("❌ Failed to parse config: {}", e);
                    None
                }
            },
            Err(e) => {
                log::error!("❌ Failed to read config file: {}", e);
                None
            }
        }
    }

    pub fn load_or_default(path: &Path) -> AppConfig {
        Self::load(path).unwrap_or_default()
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        log::info!("💾 Saved config to {:?}", path);
        Ok(())
    }

    /// Environment variables win over the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var(MODEL_ENV) {
            if !model.is_empty() {
                self.model = model;
            }
        }
        if let Ok(addr) = std::env::var(SERVER_ADDR_ENV) {
            if !addr.is_empty() {
                self.server_addr = addr;
            }
        }
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.request_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn api_key_from_env() -> Result<String, ConfigError> {
        api_key_from(std::env::var(API_KEY_ENV).ok())
    }

    pub fn orchestrator(&self, api_key: String) -> FillOrchestrator<GeminiClient> {
        let client = GeminiClient::new(self.api_base_url.clone(), api_key, self.model.clone());
        FillOrchestrator::new(client).with_timeout(self.request_timeout())
    }
}

fn api_key_from(value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(key) if !key.trim().is_empty() => Ok(key),
        _ => Err(ConfigError::MissingApiKey),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("config.json"));
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.max_canvas_dimension, 1024);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "model": "custom-model", "request_timeout_secs": 0 }"#).unwrap();

        let config = AppConfig::load_or_default(&path);
        assert_eq!(config.model, "custom-model");
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.api_base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_corrupt_file_falls_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(AppConfig::load_or_default(&path), AppConfig::default());
    }

    #[test]
    fn test_save_creates_directory_and_omits_secret() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("OutpaintStudio").join("config.json");
        AppConfig::default().save(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"model\""));
        assert!(!written.to_lowercase().contains("api_key"));
    }

    #[test]
    fn test_api_key_must_be_present() {
        assert!(matches!(api_key_from(None), Err(ConfigError::MissingApiKey)));
        assert!(matches!(
            api_key_from(Some("  ".to_string())),
            Err(ConfigError::MissingApiKey)
        ));
        assert_eq!(api_key_from(Some("abc".to_string())).unwrap(), "abc");
    }
}
