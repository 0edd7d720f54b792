// Configuration Storage Service
// Handles config file read/write and version backup

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::local_store::StoreError;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_TIMEOUT_SECS: u64 = 80;
pub const DEFAULT_MIN_WORDS: usize = 2;
pub const DEFAULT_MAX_CHARS: usize = 50_000;
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub provider: ProviderConfig,
    pub proxy: Option<ProxyConfig>,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub api_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ProxyConfig {
    pub enabled: bool,
    pub url: Option<String>,
}

impl ProxyConfig {
    /// The proxy URL to use, if proxying is switched on and a URL is set.
    pub fn active_url(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    #[serde(default = "default_model")]
    pub model: String,
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// What to do with an `ai_probability_percent` outside [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProbabilityPolicy {
    #[default]
    Reject,
    Clamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    #[serde(default = "default_min_words")]
    pub min_words: usize,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default)]
    pub probability_policy: ProbabilityPolicy,
    #[serde(default = "default_true")]
    pub enforce_summary_script: bool,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_words: DEFAULT_MIN_WORDS,
            max_chars: DEFAULT_MAX_CHARS,
            history_limit: DEFAULT_HISTORY_LIMIT,
            probability_policy: ProbabilityPolicy::Reject,
            enforce_summary_script: true,
        }
    }
}

fn default_model() -> String { DEFAULT_MODEL.to_string() }
fn default_timeout_secs() -> u64 { DEFAULT_TIMEOUT_SECS }
fn default_min_words() -> usize { DEFAULT_MIN_WORDS }
fn default_max_chars() -> usize { DEFAULT_MAX_CHARS }
fn default_history_limit() -> usize { DEFAULT_HISTORY_LIMIT }
fn default_true() -> bool { true }

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("veritas"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), StoreError> {
        fs::create_dir_all(&self.config_dir).map_err(StoreError::io(&self.config_dir))
    }

    /// Load configuration from file
    pub fn load(&self) -> Result<AppConfig, StoreError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file).map_err(StoreError::io(&self.config_file))?;

        serde_json::from_str(&content).map_err(StoreError::Parse)
    }

    /// Save configuration to file
    pub fn save(&self, config: &AppConfig) -> Result<(), StoreError> {
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config).map_err(StoreError::Parse)?;

        fs::write(&self.config_file, content).map_err(StoreError::io(&self.config_file))
    }

    fn create_backup(&self) -> Result<(), StoreError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir).map_err(StoreError::io(&backup_dir))?;

        // Sub-second suffix keeps rapid successive saves from overwriting each other.
        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file).map_err(StoreError::io(&backup_file))?;

        self.cleanup_old_backups(&backup_dir, 10)
    }

    /// Remove old backups, keeping only the most recent N
    fn cleanup_old_backups(&self, backup_dir: &Path, keep: usize) -> Result<(), StoreError> {
        let mut entries: Vec<_> = fs::read_dir(backup_dir)
            .map_err(StoreError::io(backup_dir))?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map_or(false, |ext| ext == "json"))
            .collect();

        if entries.len() <= keep {
            return Ok(());
        }

        // File names embed the timestamp, so name order is age order.
        entries.sort_by_key(|e| e.file_name());

        let remove_count = entries.len() - keep;
        for entry in entries.iter().take(remove_count) {
            let _ = fs::remove_file(entry.path());
        }

        Ok(())
    }

    /// Store provider API key in config file
    pub fn set_api_key(&self, provider: &str, key: &str) -> Result<(), StoreError> {
        let mut config = self.load()?;
        config.api_keys.insert(provider.to_string(), key.trim().to_string());
        self.save(&config)
    }

    /// Delete provider API key from config file
    pub fn delete_api_key(&self, provider: &str) -> Result<(), StoreError> {
        let mut config = self.load()?;
        config.api_keys.remove(provider);
        self.save(&config)
    }

    pub fn set_model(&self, model: &str) -> Result<(), StoreError> {
        let mut config = self.load()?;
        config.provider.model = model.trim().to_string();
        self.save(&config)
    }

    pub fn set_base_url(&self, url: Option<&str>) -> Result<(), StoreError> {
        let mut config = self.load()?;
        config.provider.base_url = url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty());
        self.save(&config)
    }
}
