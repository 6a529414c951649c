//! Application path management for portable and installed modes.
//!
//! ## Mode Detection
//!
//! - **Portable mode**: If a `.portable` marker file exists next to the
//!   executable, the config and logs live in the same directory.
//! - **Installed mode** (default): Data is stored in `%APPDATA%\Dimmer`
//!   (or equivalent on other platforms).

use std::path::{Path, PathBuf};
use tracing::debug;

/// Application name used for directories in installed mode
const APP_NAME: &str = "Dimmer";

/// Config file name inside the base directory
const CONFIG_FILE: &str = "config.yaml";

/// Application paths for config and logs.
#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Path to the logs directory
    pub logs_dir: PathBuf,
    /// Whether running in portable mode (config next to exe)
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the appropriate paths based on environment.
    ///
    /// Debug builds prefer a `config.yaml` in the current working directory
    /// (typical with `cargo run`). Otherwise a `.portable` marker next to the
    /// executable selects portable mode, and everything else is installed mode.
    ///
    /// Called before logging is initialized, so diagnostics go to stderr.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        #[cfg(debug_assertions)]
        {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            if cwd.join(CONFIG_FILE).exists() {
                eprintln!("[paths] Running in DEV mode ({} found in cwd)", CONFIG_FILE);
                return Self::portable(&cwd);
            }
        }

        if exe_dir.join(".portable").exists() {
            return Self::portable(&exe_dir);
        }

        let app_data = dirs::data_dir()
            .unwrap_or_else(|| {
                eprintln!("[paths] WARNING: dirs::data_dir() returned None, falling back to exe dir");
                exe_dir.clone()
            })
            .join(APP_NAME);

        Self::installed(&app_data)
    }

    /// Paths rooted next to the executable (or any directory)
    pub fn portable(base: &Path) -> Self {
        Self {
            config: base.join(CONFIG_FILE),
            logs_dir: base.join("logs"),
            is_portable: true,
        }
    }

    /// Paths rooted in a per-user data directory
    pub fn installed(app_data: &Path) -> Self {
        Self {
            config: app_data.join(CONFIG_FILE),
            logs_dir: app_data.join("logs"),
            is_portable: false,
        }
    }

    /// Get the base directory (for displaying in logs)
    pub fn base_dir(&self) -> PathBuf {
        self.config
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Ensure the config and logs directories exist.
    pub fn ensure_directories(&self) -> anyhow::Result<()> {
        if !self.logs_dir.exists() {
            debug!("Creating logs directory: {}", self.logs_dir.display());
            std::fs::create_dir_all(&self.logs_dir)?;
        }

        let base = self.base_dir();
        if !base.exists() {
            debug!("Creating config directory: {}", base.display());
            std::fs::create_dir_all(&base)?;
        }

        Ok(())
    }
}
