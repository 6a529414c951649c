//! Menu session state machine
//!
//! One controller per interaction surface. Each activation runs a complete
//! session on the calling thread:
//!
//! `Idle -> Building -> Open -> Applying -> Idle`
//!
//! The blocking popup inside `Open` is the only suspension point. Activations
//! arriving while a session is in progress (including re-entrant ones pumped
//! by the native menu loop) are dropped, never queued. `Exit` moves the
//! controller to `Terminated` for good.

use std::cell::Cell;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::notifier::ChangeNotifier;
use super::surface::PopupSurface;
use crate::menu::{self, Command, MenuSnapshot};
use crate::monitors::{MonitorProvider, PollingFlag};

/// Controller phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Building,
    Open,
    Applying,
    /// Reached after `Exit`; no further sessions
    Terminated,
}

/// Result of one activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Activation ignored: a session was already running or the controller exited
    Dropped,
    /// Menu dismissed, or the selection decoded to nothing actionable
    Cancelled,
    /// A command was selected but had no effect (stale monitor, failed write)
    Unchanged,
    /// Polling flag or a monitor opacity was changed
    Changed,
    /// Exit selected; shutdown requested
    Exit,
}

/// Resets the phase to `Idle` when a session ends, however it ends
struct PhaseGuard<'a> {
    phase: &'a Cell<Phase>,
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        if self.phase.get() != Phase::Terminated {
            self.phase.set(Phase::Idle);
        }
    }
}

/// Tray menu controller
pub struct MenuController<S: PopupSurface> {
    surface: S,
    monitors: Arc<dyn MonitorProvider>,
    polling: Arc<dyn PollingFlag>,
    notifier: ChangeNotifier,
    phase: Cell<Phase>,
    sessions: Cell<u64>,
}

impl<S: PopupSurface> MenuController<S> {
    pub fn new(surface: S, monitors: Arc<dyn MonitorProvider>, polling: Arc<dyn PollingFlag>) -> Self {
        Self {
            surface,
            monitors,
            polling,
            notifier: ChangeNotifier::new(),
            phase: Cell::new(Phase::Idle),
            sessions: Cell::new(0),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn phase(&self) -> Phase {
        self.phase.get()
    }

    pub fn is_terminated(&self) -> bool {
        self.phase.get() == Phase::Terminated
    }

    /// Number of sessions opened so far
    pub fn sessions_opened(&self) -> u64 {
        self.sessions.get()
    }

    /// Handle a tray icon activation: run one full menu session.
    pub fn activate(&self) -> SessionOutcome {
        match self.phase.get() {
            Phase::Idle => {}
            Phase::Terminated => {
                debug!("Ignoring activation after exit");
                return SessionOutcome::Dropped;
            }
            phase => {
                debug!("Dropping activation, session already in {:?}", phase);
                return SessionOutcome::Dropped;
            }
        }

        self.phase.set(Phase::Building);
        let _guard = PhaseGuard { phase: &self.phase };

        let session = self.sessions.get() + 1;
        self.sessions.set(session);
        debug!("Menu session {} opening", session);

        self.notifier.session_boundary(true);

        let monitors = self.monitors.list_monitors();
        let polling = self.polling.get();
        let (snapshot, codec) = menu::build(&monitors, polling);
        debug!(
            "Session {}: menu built for {} monitors (dim popups={})",
            session,
            codec.monitor_count(),
            polling
        );

        self.phase.set(Phase::Open);
        let selection = self.show(&snapshot);
        drop(snapshot);

        self.phase.set(Phase::Applying);
        let command = codec.decode_selection(selection);
        debug!("Session {}: selection {:?} -> {:?}", session, selection, command);

        let outcome = self.apply(command);
        if outcome == SessionOutcome::Changed {
            self.notifier.state_changed();
        }
        self.notifier.session_boundary(false);

        debug!("Menu session {} closed: {:?}", session, outcome);
        outcome
    }

    /// Out-of-band environmental change: notify without opening a menu
    pub fn display_changed(&self) {
        if self.is_terminated() {
            debug!("Ignoring display change after exit");
            return;
        }

        debug!("Display configuration changed");
        self.notifier.state_changed();
    }

    /// Fire the state changed notification directly (initial sync)
    pub fn notify_state(&self) {
        self.notifier.state_changed();
    }

    fn show(&self, snapshot: &MenuSnapshot) -> Option<u32> {
        self.surface.bring_to_foreground();
        let at = self.surface.cursor_position();

        let selection = self.surface.show_popup(snapshot, at);

        self.surface.post_sync();
        selection
    }

    fn apply(&self, command: Command) -> SessionOutcome {
        match command {
            Command::Exit => {
                info!("Exit selected from tray menu");
                self.phase.set(Phase::Terminated);
                self.surface.request_shutdown();
                SessionOutcome::Exit
            }
            Command::TogglePolling => {
                let enabled = !self.polling.get();
                match self.polling.set(enabled) {
                    Ok(()) => {
                        info!("Dim popups {}", if enabled { "enabled" } else { "disabled" });
                        SessionOutcome::Changed
                    }
                    Err(e) => {
                        warn!("Failed to toggle dim popups: {}", e);
                        SessionOutcome::Unchanged
                    }
                }
            }
            Command::SetOpacity { monitor, bucket } => {
                // Ordinals from the snapshot may be stale by now
                let count = self.monitors.list_monitors().len();
                if monitor >= count {
                    debug!("Monitor {} no longer present ({} monitors), ignoring", monitor, count);
                    return SessionOutcome::Unchanged;
                }

                match self.monitors.set_opacity(monitor, bucket.opacity()) {
                    Ok(()) => {
                        info!("Monitor {} opacity set to {}", monitor, bucket);
                        SessionOutcome::Changed
                    }
                    Err(e) => {
                        warn!("Failed to set opacity of monitor {}: {}", monitor, e);
                        SessionOutcome::Unchanged
                    }
                }
            }
            Command::Unknown => SessionOutcome::Cancelled,
        }
    }
}

impl<S: PopupSurface> std::fmt::Debug for MenuController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MenuController")
            .field("phase", &self.phase.get())
            .field("sessions", &self.sessions.get())
            .finish()
    }
}
