//! Tray lifecycle owner
//!
//! Owns the icon registration and the single menu controller bound to one
//! interaction surface. Teardown removes the icon before the surface goes
//! away and may run any number of times.

use tracing::{debug, info, warn};

use super::controller::{MenuController, SessionOutcome};
use super::surface::{IconRegistrar, PopupSurface, SurfaceError};
use super::{StateChangedCallback, SurfaceEvent};

/// Owner of one tray icon and its controller
pub struct TrayOwner<S: PopupSurface, R: IconRegistrar> {
    controller: Option<MenuController<S>>,
    registrar: R,
    registered: bool,
}

impl<S: PopupSurface, R: IconRegistrar> TrayOwner<S, R> {
    /// Register the tray icon and fire the initial state notification.
    ///
    /// On failure the registrar is cleaned up before the surface is released.
    pub fn new(
        mut registrar: R,
        controller: MenuController<S>,
        tooltip: &str,
        on_state_changed: Option<StateChangedCallback>,
    ) -> Result<Self, SurfaceError> {
        controller.notifier().set_on_state_changed(on_state_changed);

        if let Err(e) = registrar.register(tooltip) {
            warn!("Tray icon registration failed: {}", e);
            registrar.unregister();
            drop(controller);
            return Err(e);
        }

        info!("Tray icon registered: {}", tooltip);

        let owner = Self {
            controller: Some(controller),
            registrar,
            registered: true,
        };

        if let Some(controller) = owner.controller.as_ref() {
            controller.notify_state();
        }

        Ok(owner)
    }

    /// Controller, until shutdown
    pub fn controller(&self) -> Option<&MenuController<S>> {
        self.controller.as_ref()
    }

    pub fn registrar_mut(&mut self) -> &mut R {
        &mut self.registrar
    }

    /// Dispatch a surface event. Returns the session outcome for activations.
    pub fn handle(&self, event: SurfaceEvent) -> Option<SessionOutcome> {
        let controller = self.controller.as_ref()?;

        match event {
            SurfaceEvent::Activated => Some(controller.activate()),
            SurfaceEvent::DisplayChanged => {
                controller.display_changed();
                None
            }
        }
    }

    /// Whether the controller has exited or the owner was shut down
    pub fn is_finished(&self) -> bool {
        self.controller.as_ref().map_or(true, MenuController::is_terminated)
    }

    /// Remove the icon, then release the surface. Idempotent.
    pub fn shutdown(&mut self) {
        if self.registered {
            debug!("Removing tray icon...");
            self.registrar.unregister();
            self.registered = false;
        }

        if let Some(controller) = self.controller.take() {
            debug!("Releasing tray surface ({:?})", controller);
            drop(controller);
        }
    }
}

impl<S: PopupSurface, R: IconRegistrar> Drop for TrayOwner<S, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
