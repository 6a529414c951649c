//! Monitor and polling-flag collaborators
//!
//! The tray controller never talks to displays directly. It reads and writes
//! per-monitor dimming opacity through [`MonitorProvider`] and the "dim popups"
//! toggle through [`PollingFlag`]. [`MonitorStore`] is the in-memory
//! implementation used by the binary, seeded from configuration.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::MonitorConfig;

/// A display tracked by ordinal position and dimming opacity
#[derive(Debug, Clone, PartialEq)]
pub struct Monitor {
    /// Position in the current enumeration (valid until the next `list_monitors`)
    pub index: usize,
    /// Display label
    pub name: String,
    /// Overlay opacity in `[0.0, 1.0]`
    pub opacity: f32,
}

/// Errors raised by collaborator writes
#[derive(Debug, Error, PartialEq)]
pub enum ProviderError {
    #[error("monitor ordinal {ordinal} out of range ({count} monitors)")]
    OrdinalOutOfRange { ordinal: usize, count: usize },

    #[error("opacity {0} outside [0.0, 1.0]")]
    InvalidOpacity(f32),
}

/// Source of the current monitor list
pub trait MonitorProvider {
    /// Current ordered monitor list. Ordinals are only valid until the next call.
    fn list_monitors(&self) -> Vec<Monitor>;

    /// Set the overlay opacity of the monitor at `ordinal`
    fn set_opacity(&self, ordinal: usize, value: f32) -> Result<(), ProviderError>;
}

/// Persistent "dim popups" toggle
pub trait PollingFlag {
    fn get(&self) -> bool;
    fn set(&self, enabled: bool) -> Result<(), ProviderError>;
}

/// In-memory monitor and polling state
#[derive(Debug, Default)]
pub struct MonitorStore {
    monitors: RwLock<Vec<(String, f32)>>,
    polling: AtomicBool,
}

impl MonitorStore {
    pub fn new(monitors: &[MonitorConfig], polling: bool) -> Self {
        let store = Self::default();
        store.replace(monitors, polling);
        store
    }

    /// Replace the whole monitor set (display hot-plug or config reload)
    pub fn replace(&self, monitors: &[MonitorConfig], polling: bool) {
        let entries: Vec<(String, f32)> = monitors
            .iter()
            .map(|m| (m.name.clone(), m.opacity.clamp(0.0, 1.0)))
            .collect();

        debug!("Monitor store now tracks {} monitors (polling={})", entries.len(), polling);
        *self.monitors.write() = entries;
        self.polling.store(polling, Ordering::SeqCst);
    }

    /// Snapshot of the store as config entries, for saving
    pub fn to_config(&self) -> Vec<MonitorConfig> {
        self.monitors
            .read()
            .iter()
            .map(|(name, opacity)| MonitorConfig {
                name: name.clone(),
                opacity: *opacity,
            })
            .collect()
    }
}

impl MonitorProvider for MonitorStore {
    fn list_monitors(&self) -> Vec<Monitor> {
        self.monitors
            .read()
            .iter()
            .enumerate()
            .map(|(index, (name, opacity))| Monitor {
                index,
                name: name.clone(),
                opacity: *opacity,
            })
            .collect()
    }

    fn set_opacity(&self, ordinal: usize, value: f32) -> Result<(), ProviderError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ProviderError::InvalidOpacity(value));
        }

        let mut monitors = self.monitors.write();
        let count = monitors.len();
        let entry = monitors
            .get_mut(ordinal)
            .ok_or(ProviderError::OrdinalOutOfRange { ordinal, count })?;

        trace!("Monitor {} ({}) opacity {} -> {}", ordinal, entry.0, entry.1, value);
        entry.1 = value;
        Ok(())
    }
}

impl PollingFlag for MonitorStore {
    fn get(&self) -> bool {
        self.polling.load(Ordering::SeqCst)
    }

    fn set(&self, enabled: bool) -> Result<(), ProviderError> {
        self.polling.store(enabled, Ordering::SeqCst);
        Ok(())
    }
}
