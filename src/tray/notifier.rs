//! Observer slots for menu sessions and state changes

use std::cell::RefCell;
use tracing::trace;

use super::{SessionBoundaryCallback, StateChangedCallback};

/// Two optional, replaceable callback slots.
///
/// Callbacks are cloned out of their slot before being invoked, so a callback
/// may safely replace either slot while running.
#[derive(Default)]
pub struct ChangeNotifier {
    session_boundary: RefCell<Option<SessionBoundaryCallback>>,
    state_changed: RefCell<Option<StateChangedCallback>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or replace the session boundary callback
    pub fn set_on_session_boundary(&self, callback: Option<SessionBoundaryCallback>) {
        *self.session_boundary.borrow_mut() = callback;
    }

    /// Set or replace the state changed callback
    pub fn set_on_state_changed(&self, callback: Option<StateChangedCallback>) {
        *self.state_changed.borrow_mut() = callback;
    }

    pub fn session_boundary(&self, opening: bool) {
        let callback = self.session_boundary.borrow().clone();
        if let Some(callback) = callback {
            trace!("Notifying session boundary (opening={})", opening);
            callback(opening);
        }
    }

    pub fn state_changed(&self) {
        let callback = self.state_changed.borrow().clone();
        if let Some(callback) = callback {
            trace!("Notifying state changed");
            callback();
        }
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("session_boundary", &self.session_boundary.borrow().is_some())
            .field("state_changed", &self.state_changed.borrow().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::rc::{Rc, Weak};
    use std::sync::Arc;

    thread_local! {
        static NOTIFIER: RefCell<Weak<ChangeNotifier>> = RefCell::new(Weak::new());
    }

    #[test]
    fn test_unset_slots_are_noops() {
        let notifier = ChangeNotifier::new();
        notifier.session_boundary(true);
        notifier.state_changed();
    }

    #[test]
    fn test_slots_fire_independently() {
        let notifier = ChangeNotifier::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let boundary_log = Arc::clone(&log);
        notifier.set_on_session_boundary(Some(Arc::new(move |opening| {
            boundary_log.lock().push(format!("boundary:{}", opening));
        })));

        notifier.session_boundary(true);
        notifier.state_changed();
        notifier.session_boundary(false);

        assert_eq!(*log.lock(), vec!["boundary:true", "boundary:false"]);
    }

    #[test]
    fn test_replace_slot() {
        let notifier = ChangeNotifier::new();
        let count = Arc::new(Mutex::new((0, 0)));

        let first = Arc::clone(&count);
        notifier.set_on_state_changed(Some(Arc::new(move || first.lock().0 += 1)));
        notifier.state_changed();

        let second = Arc::clone(&count);
        notifier.set_on_state_changed(Some(Arc::new(move || second.lock().1 += 1)));
        notifier.state_changed();
        notifier.state_changed();

        assert_eq!(*count.lock(), (1, 2));

        notifier.set_on_state_changed(None);
        notifier.state_changed();
        assert_eq!(*count.lock(), (1, 2));
    }

    #[test]
    fn test_callback_may_clear_slots_while_running() {
        let notifier = Rc::new(ChangeNotifier::new());
        NOTIFIER.with(|slot| *slot.borrow_mut() = Rc::downgrade(&notifier));
        let count = Arc::new(Mutex::new(0));

        let calls = Arc::clone(&count);
        notifier.set_on_state_changed(Some(Arc::new(move || {
            *calls.lock() += 1;
            NOTIFIER.with(|slot| {
                if let Some(notifier) = slot.borrow().upgrade() {
                    notifier.set_on_state_changed(None);
                    notifier.set_on_session_boundary(None);
                }
            });
        })));
        notifier.set_on_session_boundary(Some(Arc::new(|_| {})));

        notifier.state_changed();
        notifier.state_changed();

        assert_eq!(*count.lock(), 1);
        assert_eq!(
            format!("{:?}", notifier),
            "ChangeNotifier { session_boundary: false, state_changed: false }"
        );
    }
}
