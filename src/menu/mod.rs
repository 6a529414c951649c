//! Tray menu model
//!
//! Builds an immutable [`MenuSnapshot`] from the live monitor list and the
//! "dim popups" flag. A snapshot belongs to exactly one menu session and is
//! dropped when that session ends: monitor count and order can change between
//! opens (display hot-plug), so identifiers are never reused across sessions.

pub mod codec;

pub use codec::{Command, IdentifierCodec, OpacityBucket, EXIT_ID, MONITOR_BASE, TOGGLE_POLLING_ID};

use crate::monitors::Monitor;
use tracing::trace;

/// Label of the polling toggle
pub const POLLING_LABEL: &str = "dim popups";
/// Label of the exit entry
pub const EXIT_LABEL: &str = "exit";

/// A clickable menu leaf
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuItem {
    pub id: u32,
    pub label: String,
    pub checked: bool,
}

/// One row of the root menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuEntry {
    /// Per-monitor opacity ladder
    Submenu { label: String, items: Vec<MenuItem> },
    Item(MenuItem),
    Separator,
}

/// Immutable menu tree for a single session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuSnapshot {
    entries: Vec<MenuEntry>,
}

impl MenuSnapshot {
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    /// Monitor submenus, in monitor order
    pub fn submenus(&self) -> impl Iterator<Item = (&str, &[MenuItem])> {
        self.entries.iter().filter_map(|entry| match entry {
            MenuEntry::Submenu { label, items } => Some((label.as_str(), items.as_slice())),
            _ => None,
        })
    }

    /// Every clickable item, submenu items included
    pub fn items(&self) -> impl Iterator<Item = &MenuItem> {
        self.entries.iter().flat_map(|entry| match entry {
            MenuEntry::Submenu { items, .. } => items.as_slice(),
            MenuEntry::Item(item) => std::slice::from_ref(item),
            MenuEntry::Separator => &[],
        })
    }

    /// Look up an item by identifier
    pub fn find(&self, id: u32) -> Option<&MenuItem> {
        self.items().find(|item| item.id == id)
    }
}

/// Build the menu for the current monitor list and polling flag.
///
/// Pure: no I/O, no blocking. The returned codec decodes exactly the ids
/// placed in the returned snapshot.
pub fn build(monitors: &[Monitor], polling_enabled: bool) -> (MenuSnapshot, IdentifierCodec) {
    let codec = IdentifierCodec::new(monitors.len());
    let mut entries = Vec::with_capacity(monitors.len() + 4);

    for (ordinal, monitor) in monitors.iter().enumerate() {
        let checked = OpacityBucket::nearest_below(monitor.opacity);
        trace!("Monitor {} '{}' opacity {} -> checked {}", ordinal, monitor.name, monitor.opacity, checked);

        let items = OpacityBucket::all()
            .filter_map(|bucket| {
                codec.encode(ordinal, bucket).map(|id| MenuItem {
                    id,
                    label: bucket.label(),
                    checked: bucket == checked,
                })
            })
            .collect();

        entries.push(MenuEntry::Submenu {
            label: monitor.name.clone(),
            items,
        });
    }

    entries.push(MenuEntry::Separator);
    entries.push(MenuEntry::Item(MenuItem {
        id: TOGGLE_POLLING_ID,
        label: POLLING_LABEL.to_string(),
        checked: polling_enabled,
    }));
    entries.push(MenuEntry::Separator);
    entries.push(MenuEntry::Item(MenuItem {
        id: EXIT_ID,
        label: EXIT_LABEL.to_string(),
        checked: false,
    }));

    (MenuSnapshot { entries }, codec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn monitors(opacities: &[f32]) -> Vec<Monitor> {
        opacities
            .iter()
            .enumerate()
            .map(|(index, opacity)| Monitor {
                index,
                name: format!("Display {}", index + 1),
                opacity: *opacity,
            })
            .collect()
    }

    #[test]
    fn test_layout() {
        let (snapshot, codec) = build(&monitors(&[0.0, 0.5]), true);
        let entries = snapshot.entries();

        assert_eq!(codec.monitor_count(), 2);
        assert_eq!(entries.len(), 6);
        assert!(matches!(&entries[0], MenuEntry::Submenu { label, .. } if label == "Display 1"));
        assert!(matches!(&entries[1], MenuEntry::Submenu { label, .. } if label == "Display 2"));
        assert_eq!(entries[2], MenuEntry::Separator);
        assert!(matches!(&entries[3], MenuEntry::Item(item) if item.id == TOGGLE_POLLING_ID && item.checked));
        assert_eq!(entries[4], MenuEntry::Separator);
        assert!(matches!(&entries[5], MenuEntry::Item(item) if item.id == EXIT_ID && item.label == "exit"));
    }

    #[test]
    fn test_ladder_labels_and_ids_decode() {
        let (snapshot, codec) = build(&monitors(&[0.0, 0.0, 0.0]), false);

        for (ordinal, (_, items)) in snapshot.submenus().enumerate() {
            assert_eq!(items.len(), 10);
            assert_eq!(items[0].label, "off");
            assert_eq!(items[9].label, "90%");

            for (rung, item) in items.iter().enumerate() {
                let bucket = OpacityBucket::from_percent(rung as u8 * 10).unwrap();
                assert_eq!(codec.decode(item.id), Command::SetOpacity { monitor: ordinal, bucket });
            }
        }
    }

    #[test]
    fn test_ids_unique() {
        let (snapshot, _) = build(&monitors(&[0.1; 8]), false);
        let ids: Vec<u32> = snapshot.items().map(|item| item.id).collect();
        let unique: HashSet<u32> = ids.iter().copied().collect();

        assert_eq!(ids.len(), 8 * 10 + 2);
        assert_eq!(ids.len(), unique.len());
    }

    #[test]
    fn test_checked_marker_off_ladder_value() {
        let (snapshot, _) = build(&monitors(&[0.35]), false);
        let (_, items) = snapshot.submenus().next().unwrap();

        let checked: Vec<&MenuItem> = items.iter().filter(|item| item.checked).collect();
        assert_eq!(checked.len(), 1);
        assert_eq!(checked[0].label, "30%");
    }

    #[test]
    fn test_exactly_one_checked_per_monitor() {
        let (snapshot, _) = build(&monitors(&[0.0, 0.9, 1.0, 0.7, f32::NAN]), false);

        let expected = ["off", "90%", "90%", "70%", "off"];
        for ((_, items), label) in snapshot.submenus().zip(expected) {
            let checked: Vec<&MenuItem> = items.iter().filter(|item| item.checked).collect();
            assert_eq!(checked.len(), 1);
            assert_eq!(checked[0].label, label);
        }
    }

    #[test]
    fn test_zero_monitors() {
        let (snapshot, codec) = build(&[], false);

        assert_eq!(codec.monitor_count(), 0);
        assert_eq!(snapshot.submenus().count(), 0);
        assert_eq!(snapshot.entries().len(), 4);
        assert_eq!(snapshot.entries()[0], MenuEntry::Separator);

        let toggle = snapshot.find(TOGGLE_POLLING_ID).unwrap();
        assert_eq!(toggle.label, POLLING_LABEL);
        assert!(!toggle.checked);
        assert!(snapshot.find(EXIT_ID).is_some());
    }

    #[test]
    fn test_build_is_deterministic() {
        let input = monitors(&[0.2, 0.4]);
        assert_eq!(build(&input, true), build(&input, true));
    }
}
