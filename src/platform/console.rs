//! Terminal interaction surface
//!
//! Renders the tray menu as text and reads the selection from the prompt.
//! Used on hosts without a native tray and for manual testing.

use anyhow::Result;
use colored::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::cell::{Cell, RefCell};
use std::fmt::Write as _;
use tracing::{debug, info, trace};

use crate::menu::{MenuEntry, MenuItem, MenuSnapshot};
use crate::tray::{IconRegistrar, Point, PopupSurface, SurfaceError, SurfaceEvent};

/// A line typed at the main prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    Event(SurfaceEvent),
    Quit,
    Unknown(String),
}

impl ConsoleInput {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" | "m" | "menu" => ConsoleInput::Event(SurfaceEvent::Activated),
            "d" | "display" => ConsoleInput::Event(SurfaceEvent::DisplayChanged),
            "q" | "quit" => ConsoleInput::Quit,
            other => ConsoleInput::Unknown(other.to_string()),
        }
    }
}

/// Prompt-driven popup surface
pub struct ConsoleSurface {
    editor: RefCell<DefaultEditor>,
    shutdown_requested: Cell<bool>,
}

impl ConsoleSurface {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: RefCell::new(DefaultEditor::new()?),
            shutdown_requested: Cell::new(false),
        })
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested.get()
    }

    /// Read one command from the main prompt. EOF and Ctrl-C quit.
    pub fn read_input(&self) -> ConsoleInput {
        match self.editor.borrow_mut().readline("dimmer> ") {
            Ok(line) => ConsoleInput::parse(&line),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => ConsoleInput::Quit,
            Err(e) => {
                debug!("Prompt error: {}", e);
                ConsoleInput::Quit
            }
        }
    }

    pub fn print_help(&self) {
        println!("{}", "Commands:".bold());
        println!("  {}  open the tray menu", "<enter> | menu".yellow());
        println!("  {}       simulate a display change", "display".yellow());
        println!("  {}          quit", "quit".yellow());
    }
}

/// Text rendition of a menu snapshot, one line per row
pub fn render_snapshot(snapshot: &MenuSnapshot) -> String {
    let mut out = String::new();

    for entry in snapshot.entries() {
        match entry {
            MenuEntry::Submenu { label, items } => {
                let _ = writeln!(out, "  {}", label.bold());
                for item in items {
                    let _ = writeln!(out, "    {}", render_item(item));
                }
            }
            MenuEntry::Item(item) => {
                let _ = writeln!(out, "  {}", render_item(item));
            }
            MenuEntry::Separator => {
                let _ = writeln!(out, "  {}", "--------".dimmed());
            }
        }
    }

    out
}

fn render_item(item: &MenuItem) -> String {
    let mark = if item.checked { "✓".green().to_string() } else { " ".to_string() };
    format!("{} {} {}", format!("[{}]", item.id).cyan(), mark, item.label)
}

/// Parse a typed selection. Anything but a plain number dismisses the menu.
pub fn parse_selection(line: &str) -> Option<u32> {
    line.trim().parse().ok()
}

impl PopupSurface for ConsoleSurface {
    fn bring_to_foreground(&self) {
        trace!("Console surface is always in the foreground");
    }

    fn cursor_position(&self) -> Point {
        Point::default()
    }

    fn show_popup(&self, snapshot: &MenuSnapshot, _at: Point) -> Option<u32> {
        print!("{}", render_snapshot(snapshot));

        match self.editor.borrow_mut().readline("select (enter to dismiss)> ") {
            Ok(line) => parse_selection(&line),
            Err(_) => None,
        }
    }

    fn post_sync(&self) {
        trace!("Console surface has no message queue to synchronize");
    }

    fn request_shutdown(&self) {
        info!("Shutdown requested from menu");
        self.shutdown_requested.set(true);
    }
}

/// Stand-in for the tray icon: announces registration on the terminal
#[derive(Debug, Default)]
pub struct ConsoleIcon {
    tooltip: Option<String>,
}

impl ConsoleIcon {
    pub fn tooltip(&self) -> Option<&str> {
        self.tooltip.as_deref()
    }
}

impl IconRegistrar for ConsoleIcon {
    fn register(&mut self, tooltip: &str) -> Result<(), SurfaceError> {
        println!("{} {}", "●".yellow(), tooltip.bold());
        self.tooltip = Some(tooltip.to_string());
        Ok(())
    }

    fn unregister(&mut self) {
        if let Some(tooltip) = self.tooltip.take() {
            debug!("Console icon '{}' removed", tooltip);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::menu::{self, EXIT_ID, TOGGLE_POLLING_ID};
    use crate::monitors::Monitor;

    #[test]
    fn test_parse_input() {
        assert_eq!(ConsoleInput::parse(""), ConsoleInput::Event(SurfaceEvent::Activated));
        assert_eq!(ConsoleInput::parse(" menu "), ConsoleInput::Event(SurfaceEvent::Activated));
        assert_eq!(ConsoleInput::parse("display"), ConsoleInput::Event(SurfaceEvent::DisplayChanged));
        assert_eq!(ConsoleInput::parse("q"), ConsoleInput::Quit);
        assert_eq!(ConsoleInput::parse("help"), ConsoleInput::Unknown("help".to_string()));
    }

    #[test]
    fn test_parse_selection() {
        assert_eq!(parse_selection("1030\n"), Some(1030));
        assert_eq!(parse_selection(""), None);
        assert_eq!(parse_selection("exit"), None);
        assert_eq!(parse_selection("-5"), None);
    }

    #[test]
    fn test_render_snapshot() {
        let monitors = vec![Monitor {
            index: 0,
            name: "Primary".to_string(),
            opacity: 0.2,
        }];
        let (snapshot, _) = menu::build(&monitors, true);
        let text = render_snapshot(&snapshot);

        // 1 header + 10 rungs + separator + toggle + separator + exit
        assert_eq!(text.lines().count(), 15);
        assert!(text.contains("Primary"));
        assert!(text.contains(&format!("[{}]", EXIT_ID)));
        assert!(text.contains(&format!("[{}]", TOGGLE_POLLING_ID)));
        assert!(text.contains("dim popups"));
        assert!(text.contains("90%"));
    }

    #[test]
    fn test_console_icon_unregister_idempotent() {
        let mut icon = ConsoleIcon::default();
        icon.unregister();

        icon.register("dimmer - v0").unwrap();
        assert_eq!(icon.tooltip(), Some("dimmer - v0"));

        icon.unregister();
        icon.unregister();
        assert_eq!(icon.tooltip(), None);
    }
}
