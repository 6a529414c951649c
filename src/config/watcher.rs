//! Configuration file watcher for hot-reload support

use anyhow::{Context, Result};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::AppConfig;

/// Delay before re-reading a modified file, so editors can finish writing
const DEBOUNCE: Duration = Duration::from_millis(100);

/// Config watcher that monitors file changes and delivers reloaded configs
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    rx: Receiver<AppConfig>,
}

impl ConfigWatcher {
    /// Load the config at `config_path` and start watching it
    pub fn new(config_path: impl Into<PathBuf>) -> Result<(Self, AppConfig)> {
        let config_path = config_path.into();
        let (tx, rx) = crossbeam::channel::unbounded();

        let initial_config = AppConfig::load(&config_path).context("Failed to load initial config")?;

        // notify callbacks run on the watcher's own thread
        let reload_path = config_path.clone();
        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Modify(_)) {
                        return;
                    }
                    debug!("Config file modified: {:?}", event.paths);

                    std::thread::sleep(DEBOUNCE);

                    match AppConfig::load(&reload_path) {
                        Ok(new_config) => {
                            info!("Configuration reloaded successfully");
                            if let Err(e) = tx.send(new_config) {
                                error!("Failed to send config update: {}", e);
                            }
                        }
                        Err(e) => {
                            warn!("Failed to reload config (keeping old config): {:#}", e);
                        }
                    }
                }
                Err(e) => {
                    error!("Watch error: {}", e);
                }
            }
        })?;

        watcher
            .watch(Path::new(&config_path), RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch config file: {}", config_path.display()))?;

        info!("Config file watcher started for: {}", config_path.display());

        Ok((Self { _watcher: watcher, rx }, initial_config))
    }

    /// Next pending reload, without blocking
    pub fn try_next(&self) -> Option<AppConfig> {
        self.rx.try_recv().ok()
    }

    /// Wait up to `timeout` for a reload
    pub fn next_timeout(&self, timeout: Duration) -> Option<AppConfig> {
        match self.rx.recv_timeout(timeout) {
            Ok(config) => Some(config),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_config_watcher_basic() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let config_path = temp_dir.path().join("test-config.yaml");

        let initial_config = r#"
dim_popups: false
monitors:
  - name: "Primary"
    opacity: 0.2
"#;

        fs::write(&config_path, initial_config)?;

        let (watcher, config) = ConfigWatcher::new(&config_path)?;

        assert!(!config.dim_popups);
        assert_eq!(config.monitors[0].name, "Primary");

        let modified_config = r#"
dim_popups: true
monitors:
  - name: "Primary"
    opacity: 0.2
  - name: "Secondary"
"#;

        std::thread::sleep(Duration::from_millis(100));
        fs::write(&config_path, modified_config)?;

        // File system events are not guaranteed on every platform/runner
        if let Some(new_config) = watcher.next_timeout(Duration::from_secs(2)) {
            assert!(new_config.dim_popups);
            assert_eq!(new_config.monitors.len(), 2);
        }

        Ok(())
    }

    #[test]
    fn test_missing_config_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = ConfigWatcher::new(temp_dir.path().join("absent.yaml"));
        assert!(result.is_err());
    }
}
