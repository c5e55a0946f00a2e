use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use anyhow::{Result, anyhow};

use crate::ai::{claude, openai};
use crate::backend::Backend;
use crate::orchestrator::FailurePolicy;

pub const DEFAULT_GATEWAY_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    pub claude_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub claude_model: String,
    pub openai_model: String,
    pub claude_base_url: String,
    pub openai_base_url: String,
    /// Address `serve` binds the dispatch gateway to.
    pub gateway_addr: String,
    /// Tab shown first in the terminal UI.
    pub default_backend: Backend,
    pub failure_policy: FailurePolicy,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            claude_api_key: None,
            openai_api_key: None,
            claude_model: claude::DEFAULT_MODEL.to_string(),
            openai_model: openai::DEFAULT_MODEL.to_string(),
            claude_base_url: claude::DEFAULT_BASE_URL.to_string(),
            openai_base_url: openai::DEFAULT_BASE_URL.to_string(),
            gateway_addr: DEFAULT_GATEWAY_ADDR.to_string(),
            default_backend: Backend::Claude,
            failure_policy: FailurePolicy::default(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Load the config file (defaults if missing), then apply `ANTHROPIC_API_KEY`
    /// and `OPENAI_API_KEY` from the environment.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_overrides(
            std::env::var("ANTHROPIC_API_KEY").ok(),
            std::env::var("OPENAI_API_KEY").ok(),
        );
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)
            .map_err(|e| anyhow!("Invalid config file {}: {}", path.display(), e))?;
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

    /// Store a key in the config file without picking up environment overrides.
    pub fn save_api_key(backend: Backend, key: &str) -> Result<PathBuf> {
        let path = Self::get_config_path()?;
        let mut config = Self::load_from(&path)?;
        config.set_api_key(backend, key);
        config.save_to(&path)?;
        Ok(path)
    }

    fn apply_overrides(&mut self, anthropic: Option<String>, openai: Option<String>) {
        if let Some(key) = anthropic.filter(|k| !k.trim().is_empty()) {
            self.claude_api_key = Some(key);
        }
        if let Some(key) = openai.filter(|k| !k.trim().is_empty()) {
            self.openai_api_key = Some(key);
        }
    }

    pub fn set_api_key(&mut self, backend: Backend, key: &str) {
        let key = Some(key.trim().to_string());
        match backend {
            Backend::Claude => self.claude_api_key = key,
            Backend::ChatGpt => self.openai_api_key = key,
        }
    }

    /// Configured key for `backend`, ignoring blank values.
    pub fn api_key(&self, backend: Backend) -> Option<&str> {
        let key = match backend {
            Backend::Claude => self.claude_api_key.as_deref(),
            Backend::ChatGpt => self.openai_api_key.as_deref(),
        };
        key.filter(|k| !k.trim().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("second-opinion").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.gateway_addr, DEFAULT_GATEWAY_ADDR);
        assert_eq!(config.failure_policy, FailurePolicy::Shared);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::new();
        config.set_api_key(Backend::ChatGpt, " sk-test ");
        config.failure_policy = FailurePolicy::PerBackend;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_key(Backend::ChatGpt), Some("sk-test"));
        assert_eq!(loaded.api_key(Backend::Claude), None);
        assert_eq!(loaded.failure_policy, FailurePolicy::PerBackend);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"claude_model":"claude-x","failure_policy":"per_backend"}"#).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.claude_model, "claude-x");
        assert_eq!(loaded.openai_model, openai::DEFAULT_MODEL);
        assert_eq!(loaded.failure_policy, FailurePolicy::PerBackend);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides_replace_file_keys() {
        let mut config = Config::new();
        config.set_api_key(Backend::Claude, "from-file");
        config.apply_overrides(Some("from-env".to_string()), Some("  ".to_string()));
        assert_eq!(config.api_key(Backend::Claude), Some("from-env"));
        assert_eq!(config.api_key(Backend::ChatGpt), None);
    }

    #[test]
    fn test_blank_key_is_not_configured() {
        let mut config = Config::new();
        config.claude_api_key = Some("".to_string());
        assert_eq!(config.api_key(Backend::Claude), None);
    }
}
