//! Configuration management for dailyspark-admin
//!
//! Handles loading, saving, and default configuration values.
//! Config file location: ~/.config/dailyspark-admin/config.toml

use crate::deferred::{PendingPolicy, UndoDelay};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "http://localhost:3000";
pub const API_BASE_ENV: &str = "DAILYSPARK_API_BASE";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub theme: ThemeName,
    pub api: ApiOptions,
    pub undo: UndoOptions,
    pub list: ListOptions,
    pub toast: ToastOptions,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            theme: ThemeName::Gruvbox,
            api: ApiOptions::default(),
            undo: UndoOptions::default(),
            list: ListOptions::default(),
            toast: ToastOptions::default(),
        }
    }
}

impl Config {
    /// Get the config file path
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?
            .join("dailyspark-admin");
        Ok(config_dir.join("config.toml"))
    }

    /// Load config from file, or create default if not exists
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Config::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {:?}", path))?;

        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {:?}", path))?;

        Ok(())
    }

    /// Reject values the rest of the app cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.undo.delay_ms == 0 {
            bail!("undo.delay_ms must be greater than zero");
        }
        if self.list.page_size == 0 {
            bail!("list.page_size must be greater than zero");
        }
        Ok(())
    }

    /// Resolve the API base URL: flag, then environment, then config file
    pub fn resolve_api_base(&self, flag: Option<&str>) -> String {
        let env = std::env::var(API_BASE_ENV).ok();
        resolve_api_base(flag, env.as_deref(), self.api.base_url.as_deref())
    }

    pub fn undo_delay(&self) -> Result<UndoDelay> {
        UndoDelay::from_millis(self.undo.delay_ms).context("Invalid undo delay")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs.max(1))
    }

    pub fn shutdown_wait(&self) -> Duration {
        Duration::from_millis(self.undo.shutdown_wait_ms)
    }
}

/// Pick the first non-blank candidate and normalize it
pub fn resolve_api_base(flag: Option<&str>, env: Option<&str>, file: Option<&str>) -> String {
    [flag, env, file]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|candidate| !candidate.is_empty())
        .map(normalize_base_url)
        .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
}

/// Trim trailing slashes and a stray `/api` suffix
pub fn normalize_base_url(base: &str) -> String {
    let clean = base.trim().trim_end_matches('/');
    clean.strip_suffix("/api").unwrap_or(clean).to_string()
}

/// Available theme names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
    #[default]
    Gruvbox,
    Nord,
    Transparent,
}

impl ThemeName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Gruvbox => "Gruvbox",
            ThemeName::Nord => "Nord",
            ThemeName::Transparent => "Transparent",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ThemeName::Gruvbox => ThemeName::Nord,
            ThemeName::Nord => ThemeName::Transparent,
            ThemeName::Transparent => ThemeName::Gruvbox,
        }
    }
}

/// Backend connection options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiOptions {
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: 15,
        }
    }
}

/// Undo window for destructive actions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UndoOptions {
    pub delay_ms: u64,
    pub policy: PendingPolicy,
    /// How long quitting waits for deletes already sent to the backend
    pub shutdown_wait_ms: u64,
}

impl Default for UndoOptions {
    fn default() -> Self {
        Self {
            delay_ms: 4000,
            policy: PendingPolicy::Single,
            shutdown_wait_ms: 5000,
        }
    }
}

impl UndoOptions {
    const DELAY_CHOICES: [u64; 4] = [3000, 4000, 5000, 10_000];

    /// Cycle through the preset delays
    pub fn next_delay(&mut self) {
        let idx = Self::DELAY_CHOICES
            .iter()
            .position(|d| *d == self.delay_ms)
            .map(|i| (i + 1) % Self::DELAY_CHOICES.len())
            .unwrap_or(0);
        self.delay_ms = Self::DELAY_CHOICES[idx];
    }
}

/// List screen options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListOptions {
    /// Rows per page; also the `limit` sent for server-paged lists
    pub page_size: usize,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self { page_size: 20 }
    }
}

/// Toast auto-dismiss durations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToastOptions {
    pub success_ms: u64,
    pub error_ms: u64,
}

impl Default for ToastOptions {
    fn default() -> Self {
        Self {
            success_ms: 3000,
            error_ms: 4000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.theme, ThemeName::Gruvbox);
        assert_eq!(config.undo.delay_ms, 4000);
        assert_eq!(config.undo.policy, PendingPolicy::Single);
        assert_eq!(config.shutdown_wait(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_theme_cycle() {
        let theme = ThemeName::Gruvbox;
        assert_eq!(theme.next(), ThemeName::Nord);
        assert_eq!(theme.next().next(), ThemeName::Transparent);
        assert_eq!(theme.next().next().next(), ThemeName::Gruvbox);
    }

    #[test]
    fn test_base_url_resolution_order() {
        assert_eq!(
            resolve_api_base(Some("https://flag.example"), Some("https://env.example"), None),
            "https://flag.example"
        );
        assert_eq!(
            resolve_api_base(None, Some("https://env.example/"), Some("https://file.example")),
            "https://env.example"
        );
        assert_eq!(
            resolve_api_base(Some("  "), None, Some("https://file.example/api/")),
            "https://file.example"
        );
        assert_eq!(resolve_api_base(None, None, None), DEFAULT_API_BASE);
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(normalize_base_url("https://x.dev///"), "https://x.dev");
        assert_eq!(normalize_base_url(" https://x.dev/api "), "https://x.dev");
        assert_eq!(normalize_base_url("https://x.dev/apis"), "https://x.dev/apis");
    }

    #[test]
    fn test_delay_cycle() {
        let mut undo = UndoOptions::default();
        undo.next_delay();
        assert_eq!(undo.delay_ms, 5000);
        undo.next_delay();
        undo.next_delay();
        assert_eq!(undo.delay_ms, 3000);

        undo.delay_ms = 1234;
        undo.next_delay();
        assert_eq!(undo.delay_ms, 3000);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.theme = ThemeName::Nord;
        config.undo.policy = PendingPolicy::PerTarget;
        config.api.base_url = Some("https://api.example".into());
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.theme, ThemeName::Nord);
        assert_eq!(loaded.undo.policy, PendingPolicy::PerTarget);
        assert_eq!(loaded.api.base_url.as_deref(), Some("https://api.example"));
    }

    #[test]
    fn test_zero_delay_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[undo]\ndelay_ms = 0\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_missing_file_creates_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.list.page_size, 20);
    }
}
