use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

use crate::backend::Backend;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Environment variable that overrides the configured base URL.
pub const BASE_URL_ENV: &str = "CHATBOT_API_URL";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub backend: Backend,
    pub base_url: String,
    pub request_timeout_secs: u64,
    /// Minimum selection length (exclusive) before an automatic question is
    /// sent. `None` uses the backend's default.
    pub selection_threshold: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            backend: Backend::Ask,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            selection_threshold: None,
        }
    }

    /// Load from the user config directory, returning defaults when no file exists.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: Config = serde_json::from_str(&config_content)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    /// Apply the environment override and then any explicit overrides, in
    /// increasing order of precedence.
    pub fn with_overrides(mut self, env_base_url: Option<String>, flag_base_url: Option<String>) -> Self {
        if let Some(url) = env_base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        if let Some(url) = flag_base_url.filter(|u| !u.trim().is_empty()) {
            self.base_url = url;
        }
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn selection_threshold(&self) -> usize {
        self.selection_threshold
            .unwrap_or_else(|| self.backend.default_selection_threshold())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("course-assistant").join("config.json"))
    }
}
