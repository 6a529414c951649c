//! Native interaction surface seams
//!
//! The controller only needs a handful of platform operations. Keeping them
//! behind traits lets the Win32 window, the console rendition and test fakes
//! share one state machine.

use thiserror::Error;

use crate::menu::MenuSnapshot;

/// Screen position in physical pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

/// Failures while creating or registering the native surface
#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to register window class")]
    ClassRegistration,

    #[error("failed to create surface window: {0}")]
    WindowCreation(String),

    #[error("failed to create tray icon: {0}")]
    Icon(String),
}

/// Popup display operations of the surface that owns the menu
pub trait PopupSurface {
    /// Raise the owning surface so the popup does not open behind other windows
    fn bring_to_foreground(&self);

    /// Current pointer position
    fn cursor_position(&self) -> Point;

    /// Show `snapshot` at `at` and block until the user picks an item or
    /// dismisses the menu. Returns the picked identifier, `None` on dismissal.
    fn show_popup(&self, snapshot: &MenuSnapshot, at: Point) -> Option<u32>;

    /// Post a no-op message to the surface's own queue after the popup returns.
    ///
    /// Win32 otherwise keeps the menu "open" and re-shows it on the next
    /// unrelated activation.
    fn post_sync(&self);

    /// Ask the host process to shut down
    fn request_shutdown(&self);
}

/// Registration of the visible tray icon
pub trait IconRegistrar {
    fn register(&mut self, tooltip: &str) -> Result<(), SurfaceError>;

    /// Remove the icon. Must be safe to call when nothing is registered.
    fn unregister(&mut self);
}
