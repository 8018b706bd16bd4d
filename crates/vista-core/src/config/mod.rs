//! Configuration management for Vista.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults. Every section is `#[serde(default)]`, so a config file only needs
//! the keys it wants to change.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::tier::{TierLimits, TierRegistry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for Vista.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Per-run defaults (resolution, tier, save policy, breaker)
    pub run: RunDefaults,

    /// Request limits
    pub limits: LimitsConfig,

    /// Retry policy for transient API failures
    pub retry: RetryConfig,

    /// Token prices used by the run report
    pub pricing: PricingConfig,

    /// Rate-limit tiers keyed by display name
    pub tiers: TierRegistry,

    /// OpenAI-compatible endpoint settings
    pub openai: OpenAiConfig,

    /// Caption request/response settings
    pub captions: CaptionsConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.vista.vista/config.toml
    /// - Linux: ~/.config/vista/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\vista\config\config.toml
    ///
    /// Falls back to ~/.vista/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Directory holding `config.toml` and `presets.json`.
    pub fn config_dir() -> PathBuf {
        directories::ProjectDirs::from("com", "vista", "vista")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".vista")
            })
    }

    /// Default location of the prompt presets file.
    pub fn presets_path() -> PathBuf {
        Self::config_dir().join("presets.json")
    }

    /// Get the resolved output root (with ~ expansion).
    pub fn output_dir(&self) -> PathBuf {
        let path_str = self.general.output_dir.to_string_lossy();
        let expanded = shellexpand::tilde(&path_str);
        PathBuf::from(expanded.into_owned())
    }

    /// Limits of the currently selected tier.
    pub fn current_tier(&self) -> Option<&TierLimits> {
        self.tiers.get(&self.run.tier)
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.run.resolution, 1024);
        assert_eq!(config.run.tier, "Free");
        assert_eq!(config.run.max_consecutive_errors, 5);
        assert!(config.run.save_individual);
        assert!(!config.run.save_local);
        assert_eq!(config.limits.request_timeout_ms, 60_000);
    }

    #[test]
    fn test_config_to_toml() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[general]"));
        assert!(toml.contains("[run]"));
        assert!(toml.contains("[tiers."));
    }

    #[test]
    fn test_toml_round_trip_keeps_tiers() {
        let config = Config::default();
        let toml = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.tiers.len(), config.tiers.len());
        assert!(parsed.current_tier().is_some());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[run]\nresolution = 512\nbatch = true\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.run.resolution, 512);
        assert!(config.run.batch);
        assert_eq!(config.run.tier, "Free");
        assert_eq!(config.openai.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[run]\nresolution = 800\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("resolution"));
    }

    #[test]
    fn test_output_dir_expands_tilde() {
        let mut config = Config::default();
        config.general.output_dir = PathBuf::from("~/captions");
        let dir = config.output_dir();
        assert!(!dir.to_string_lossy().starts_with('~'));
    }
}
