use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_ENDPOINT: &str = "/predict";
pub const DEFAULT_FIELD_NAME: &str = "resume";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the prediction service
    #[serde(default = "default_server_url")]
    pub server_url: String,

    /// Path of the prediction endpoint on that server
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Multipart field the file is sent under
    #[serde(default = "default_field_name")]
    pub field_name: String,

    /// Directory the file browser opens in (updated after each pick)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_directory: Option<PathBuf>,

    /// List dotfiles in the file browser
    #[serde(default)]
    pub show_hidden: bool,

    /// Desktop notification when an analysis finishes
    #[serde(default)]
    pub notifications: bool,
}

fn default_server_url() -> String {
    DEFAULT_SERVER_URL.to_string()
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_field_name() -> String {
    DEFAULT_FIELD_NAME.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            endpoint: default_endpoint(),
            field_name: default_field_name(),
            last_directory: None,
            show_hidden: false,
            notifications: false,
        }
    }
}

impl AppConfig {
    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?
            .join("resumatch");

        if let Err(e) = std::fs::create_dir_all(&config_dir) {
            tracing::warn!("Could not create config directory: {}", e);
        }

        Ok(config_dir.join("config.toml"))
    }

    /// Directory for log files
    pub fn log_dir() -> PathBuf {
        dirs::data_local_dir()
            .map(|d| d.join("resumatch"))
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        let path = match Self::config_path() {
            Ok(p) => p,
            Err(_) => return Ok(AppConfig::default()),
        };

        if let Some(config) = Self::load_from(&path) {
            return Ok(config);
        }

        let config = AppConfig::default();
        if !path.exists() {
            if let Err(e) = config.save_to(&path) {
                tracing::warn!("Failed to write default config: {}", e);
            }
        }
        Ok(config)
    }

    fn load_from(path: &Path) -> Option<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("Failed to read config: {}", e);
                }
                return None;
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!("Failed to parse config: {}", e);
                None
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Record `dir` as the last directory in the file at `path`, leaving
    /// every other stored setting as it is on disk
    pub fn remember_directory(path: &Path, dir: &Path) -> Result<()> {
        let mut stored = Self::load_from(path).unwrap_or_default();
        stored.last_directory = Some(dir.to_path_buf());
        stored.save_to(path)
    }

    /// Full URL of the prediction endpoint
    pub fn predict_url(&self) -> String {
        let base = self.server_url.trim_end_matches('/');
        let endpoint = self.endpoint.trim_start_matches('/');
        format!("{}/{}", base, endpoint)
    }
}
