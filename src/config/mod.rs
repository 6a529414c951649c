//! Configuration management for the dimmer tray
//!
//! Handles loading, parsing, and hot-reloading of YAML configuration files.

pub mod persistence;
pub mod watcher;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use persistence::StatePersister;
pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppConfig {
    /// Initial state of the "dim popups" toggle
    #[serde(default)]
    pub dim_popups: bool,
    #[serde(default)]
    pub tray: TrayConfig,
    /// Monitors in enumeration order
    #[serde(default)]
    pub monitors: Vec<MonitorConfig>,
}

/// Tray icon configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TrayConfig {
    /// Tooltip prefix; the version is appended
    #[serde(default = "default_tooltip")]
    pub tooltip: String,
}

/// Seed state of one monitor
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MonitorConfig {
    pub name: String,
    #[serde(default)]
    pub opacity: f32,
}

impl Default for TrayConfig {
    fn default() -> Self {
        Self {
            tooltip: default_tooltip(),
        }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&contents).with_context(|| format!("Failed to parse YAML config: {}", path.display()))
    }

    /// Parse configuration from YAML text
    pub fn parse(contents: &str) -> Result<Self> {
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(contents)?)
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        fs::write(path, yaml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}

// Default value functions
fn default_tooltip() -> String { "dimmer".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full() {
        let config = AppConfig::parse(
            r#"
dim_popups: true
tray:
  tooltip: "my dimmer"
monitors:
  - name: "Primary"
    opacity: 0.3
  - name: "Side"
"#,
        )
        .unwrap();

        assert!(config.dim_popups);
        assert_eq!(config.tray.tooltip, "my dimmer");
        assert_eq!(config.monitors.len(), 2);
        assert_eq!(config.monitors[0].opacity, 0.3);
        assert_eq!(config.monitors[1].opacity, 0.0);
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::parse("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.tray.tooltip, "dimmer");
        assert!(!config.dim_popups);

        let partial = AppConfig::parse("dim_popups: true").unwrap();
        assert!(partial.monitors.is_empty());
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(AppConfig::parse("monitors: 12").is_err());
    }

    #[test]
    fn test_save_load() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("config.yaml");

        let config = AppConfig {
            dim_popups: true,
            tray: TrayConfig::default(),
            monitors: vec![MonitorConfig {
                name: "Primary".to_string(),
                opacity: 0.5,
            }],
        };

        config.save(&path)?;
        assert_eq!(AppConfig::load(&path)?, config);

        Ok(())
    }

    #[test]
    fn test_load_missing_file() {
        let err = AppConfig::load("/nonexistent/dimmer.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
