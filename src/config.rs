use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::gemini::{DEFAULT_CHAT_MODEL, DEFAULT_IMAGE_MODEL};

/// Environment variables checked for the API key, in order
pub const API_KEY_ENV_VARS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub schema_version: u32,
    pub api_key: String,
    pub image_model: String,
    pub chat_model: String,

    /// Pause between image calls
    pub pacing_ms: u64,
    pub request_timeout_secs: u64,

    /// Where PDFs and images are written; current directory when unset
    pub output_dir: Option<PathBuf>,
    /// History and preferences; `~/.coloringbook/data` when unset
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema_version: 1,
            api_key: String::new(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            pacing_ms: 1000,
            request_timeout_secs: 60,
            output_dir: None,
            data_dir: None,
        }
    }
}

impl Config {
    /// Get the default config directory
    pub fn config_dir() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Failed to get home directory")?;
        Ok(home.join(".coloringbook"))
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the default path, or return defaults
    pub fn load_or_default() -> Self {
        match Self::config_path().and_then(|path| Self::load(&path)) {
            Ok(config) => config,
            Err(e) => {
                debug!("Failed to load config, using default: {}", e);
                Self::default()
            }
        }
    }

    /// Load config from file, or defaults when the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            serde_json::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")
    }

    /// Fill the API key from the environment when the file left it empty
    pub fn apply_env(&mut self) {
        self.apply_env_with(|name| std::env::var(name).ok());
    }

    fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if !self.api_key.trim().is_empty() {
            return;
        }
        if let Some(key) = API_KEY_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .find(|value| !value.trim().is_empty())
        {
            self.api_key = key;
        }
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn get_data_dir(&self) -> Result<PathBuf> {
        match self.data_dir {
            Some(ref dir) => Ok(dir.clone()),
            None => Ok(Self::config_dir()?.join("data")),
        }
    }

    pub fn get_output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// API key with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return "(not set)".to_string();
        }
        let visible: String = key.chars().rev().take(4).collect::<Vec<_>>().into_iter().rev().collect();
        format!("****{}", visible)
    }
}
