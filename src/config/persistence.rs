//! Write-back of menu state to the config file
//!
//! Opacities and the "dim popups" toggle chosen from the menu are saved to the
//! YAML file they were loaded from. Reloads that match the last saved state
//! (the watcher seeing our own write) are ignored.

use anyhow::Result;
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::{debug, info};

use super::AppConfig;
use crate::monitors::{MonitorStore, PollingFlag};

/// Keeps the config file in step with the monitor store
#[derive(Debug)]
pub struct StatePersister {
    path: PathBuf,
    saved: Mutex<AppConfig>,
}

impl StatePersister {
    /// `loaded` is the config as currently on disk
    pub fn new(path: impl Into<PathBuf>, loaded: AppConfig) -> Self {
        Self {
            path: path.into(),
            saved: Mutex::new(loaded),
        }
    }

    /// Config reflecting the store, keeping the non-dimming sections as saved
    pub fn snapshot(&self, store: &MonitorStore) -> AppConfig {
        AppConfig {
            dim_popups: PollingFlag::get(store),
            tray: self.saved.lock().tray.clone(),
            monitors: store.to_config(),
        }
    }

    /// Save the store's state if it differs from the file. Returns whether the file was written.
    pub fn persist(&self, store: &MonitorStore) -> Result<bool> {
        let current = self.snapshot(store);

        let mut saved = self.saved.lock();
        if *saved == current {
            return Ok(false);
        }

        current.save(&self.path)?;
        info!("Dimming state saved to {}", self.path.display());
        *saved = current;
        Ok(true)
    }

    /// Accept a reloaded config. Returns `false` when it matches the last saved state.
    pub fn accept_reload(&self, config: &AppConfig) -> bool {
        let mut saved = self.saved.lock();
        if *saved == *config {
            debug!("Config reload matches saved state, ignoring");
            return false;
        }

        *saved = config.clone();
        true
    }
}
