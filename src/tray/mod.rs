//! System tray UI module
//!
//! Drives the dimmer's tray popup menu:
//! - Builds a fresh per-monitor opacity menu on every activation
//! - Applies the selection to the monitor store and polling flag
//! - Notifies the host around menu sessions and after state changes

use std::sync::Arc;

// Module exports
pub mod controller;
pub mod icons;
pub mod notifier;
pub mod owner;
pub mod surface;


// Re-exports
pub use controller::{MenuController, Phase, SessionOutcome};
pub use notifier::ChangeNotifier;
pub use owner::TrayOwner;
pub use surface::{IconRegistrar, Point, PopupSurface, SurfaceError};

/// Events delivered by the native interaction surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// User released the left or right button on the tray icon
    Activated,
    /// Display configuration changed (monitor hot-plug, resolution change)
    DisplayChanged,
}

/// Callback fired around menu sessions (`true` before opening, `false` after closing)
pub type SessionBoundaryCallback = Arc<dyn Fn(bool) + Send + Sync>;

/// Callback fired after a state mutation or an environmental change
pub type StateChangedCallback = Arc<dyn Fn() + Send + Sync>;
