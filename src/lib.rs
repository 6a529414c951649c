//! Dimmer tray
//!
//! Tray popup controller for per-monitor screen dimming: builds a fresh
//! opacity menu on every activation, applies the selection to the monitor
//! store and notifies the host when dimming state changes.

pub mod config;
pub mod menu;
pub mod monitors;
pub mod paths;
pub mod platform;
pub mod tray;
