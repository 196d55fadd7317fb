//! Configuration Management
//!
//! Handles persistent configuration storage for cloudrecon. Values resolve in
//! the order CLI flag > environment > config file > built-in default.

use crate::enumeration::OrchestratorOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";
pub const API_URL_ENV: &str = "CLOUDRECON_API_URL";
pub const TOKEN_ENV: &str = "CLOUDRECON_TOKEN";

const DEFAULT_PROGRESS_TICK_MS: u64 = 200;

fn default_progress_tick_ms() -> u64 {
    DEFAULT_PROGRESS_TICK_MS
}

/// User configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the enumeration backend
    #[serde(default)]
    pub api_base_url: Option<String>,
    /// Sent verbatim as the Authorization header
    #[serde(default)]
    pub api_token: Option<String>,
    /// Override for the resource group store file
    #[serde(default)]
    pub groups_path: Option<PathBuf>,
    #[serde(default = "default_progress_tick_ms")]
    pub progress_tick_ms: u64,
    #[serde(default)]
    pub type_pacing_ms: u64,
    /// Last used credential
    #[serde(default)]
    pub last_credential_id: Option<u64>,
    /// Last used provider
    #[serde(default)]
    pub last_provider: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: None,
            api_token: None,
            groups_path: None,
            progress_tick_ms: DEFAULT_PROGRESS_TICK_MS,
            type_pacing_ms: 0,
            last_credential_id: None,
            last_provider: None,
        }
    }
}

impl Config {
    /// Directory holding the config, the log and the group store
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cloudrecon"))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from a specific file; missing or corrupt files yield the defaults
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring unreadable config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Get effective API URL (CLI > env > config > default)
    pub fn effective_api_url(&self, flag: Option<&str>) -> String {
        pick(flag, env_value(API_URL_ENV), self.api_base_url.as_deref())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    /// Get effective token (CLI > env > config)
    pub fn effective_token(&self, flag: Option<&str>) -> Option<String> {
        pick(flag, env_value(TOKEN_ENV), self.api_token.as_deref())
    }

    /// Resource group store file
    pub fn effective_groups_path(&self) -> PathBuf {
        self.groups_path
            .clone()
            .or_else(|| Self::config_dir().map(|p| p.join("groups.json")))
            .unwrap_or_else(|| PathBuf::from("cloudrecon-groups.json"))
    }

    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            progress_tick: Duration::from_millis(self.progress_tick_ms),
            type_pacing: Duration::from_millis(self.type_pacing_ms),
        }
    }

    /// Remember the credential and save
    pub fn remember_credential(&mut self, credential_id: u64, provider: &str) -> Result<()> {
        self.last_credential_id = Some(credential_id);
        self.last_provider = Some(provider.to_string());
        self.save()
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// First non-blank value in precedence order
fn pick(flag: Option<&str>, env: Option<String>, file: Option<&str>) -> Option<String> {
    flag.map(str::to_string)
        .into_iter()
        .chain(env)
        .chain(file.map(str::to_string))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence() {
        assert_eq!(
            pick(Some("flag"), Some("env".into()), Some("file")).as_deref(),
            Some("flag")
        );
        assert_eq!(pick(None, Some("env".into()), Some("file")).as_deref(), Some("env"));
        assert_eq!(pick(Some("  "), None, Some("file")).as_deref(), Some("file"));
        assert_eq!(pick(None, None, None), None);
    }

    #[test]
    fn test_missing_and_corrupt_files_use_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        assert_eq!(Config::load_from(&path), Config::default());

        std::fs::write(&path, "{not json").unwrap();
        assert_eq!(Config::load_from(&path), Config::default());
    }

    #[test]
    fn test_save_creates_parent_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            api_base_url: Some("https://recon.example/api".into()),
            type_pacing_ms: 25,
            ..Config::default()
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded, config);
        assert_eq!(
            loaded.orchestrator_options().type_pacing,
            Duration::from_millis(25)
        );
    }

    #[test]
    fn test_partial_file_keeps_tick_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_token":"abc"}"#).unwrap();

        let loaded = Config::load_from(&path);
        assert_eq!(loaded.api_token.as_deref(), Some("abc"));
        assert_eq!(loaded.progress_tick_ms, 200);
    }
}
