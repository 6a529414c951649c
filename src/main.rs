//! Dimmer tray
//!
//! Tray icon whose popup menu sets per-monitor dimming and the "dim popups" flag.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dimmer_tray::config::{AppConfig, ConfigWatcher, StatePersister};
use dimmer_tray::menu::OpacityBucket;
use dimmer_tray::monitors::{MonitorProvider, MonitorStore, PollingFlag};
use dimmer_tray::paths::AppPaths;
use dimmer_tray::platform::console::{ConsoleIcon, ConsoleInput, ConsoleSurface};
use dimmer_tray::tray::{
    IconRegistrar, MenuController, PopupSurface, SessionBoundaryCallback, StateChangedCallback, SurfaceEvent,
    TrayOwner,
};

/// Dimmer - per-monitor screen dimming from the system tray
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults to the detected app directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Use the terminal menu instead of the native tray icon
    #[arg(long)]
    console: bool,
}

fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let paths = AppPaths::detect();
    paths.ensure_directories()?;

    let _log_guard = init_logging(&args.log_level, &paths.logs_dir)?;

    info!("Starting Dimmer v{}...", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", paths.base_dir().display());

    let config_path = args.config.clone().unwrap_or_else(|| paths.config.clone());
    if !config_path.exists() {
        info!("No config found, writing defaults to {}", config_path.display());
        AppConfig::default().save(&config_path)?;
    }

    let (watcher, config) = ConfigWatcher::new(&config_path)?;
    info!("Configuration loaded with {} monitors", config.monitors.len());

    let store = Arc::new(MonitorStore::new(&config.monitors, config.dim_popups));
    let tooltip = format!("{} - v{}", config.tray.tooltip, env!("CARGO_PKG_VERSION"));
    let persister = Arc::new(StatePersister::new(&config_path, config));

    #[cfg(windows)]
    if !args.console {
        return run_native(store, persister, watcher, &tooltip);
    }

    run_console(store, persister, watcher, &tooltip)
}

fn init_logging(level: &str, logs_dir: &Path) -> Result<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let file_appender = tracing_appender::rolling::daily(logs_dir, "dimmer.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(guard)
}

/// Strongest dimming level across all monitors
#[cfg(windows)]
fn strongest_bucket(store: &MonitorStore) -> OpacityBucket {
    store
        .list_monitors()
        .iter()
        .map(|m| OpacityBucket::nearest_below(m.opacity))
        .max()
        .unwrap_or(OpacityBucket::OFF)
}

fn session_boundary_callback() -> SessionBoundaryCallback {
    Arc::new(|opening| {
        if opening {
            debug!("Menu opening, suspending overlay effects");
        } else {
            debug!("Menu closed, resuming overlay effects");
        }
    })
}

fn state_changed_callback(store: Arc<MonitorStore>, persister: Arc<StatePersister>) -> StateChangedCallback {
    Arc::new(move || {
        let summary: Vec<String> = store
            .list_monitors()
            .iter()
            .map(|m| format!("{}={}", m.name, OpacityBucket::nearest_below(m.opacity)))
            .collect();
        let polling = PollingFlag::get(store.as_ref());

        info!("Dimming state: [{}] dim popups={}", summary.join(", "), polling);

        if let Err(e) = persister.persist(&store) {
            warn!("Failed to save dimming state: {:#}", e);
        }
    })
}

/// Apply a reloaded config unless it is the echo of our own save
fn apply_reload<S: PopupSurface, R: IconRegistrar>(
    config: AppConfig,
    store: &MonitorStore,
    persister: &StatePersister,
    owner: &TrayOwner<S, R>,
) -> bool {
    if !persister.accept_reload(&config) {
        return false;
    }

    store.replace(&config.monitors, config.dim_popups);
    owner.handle(SurfaceEvent::DisplayChanged);
    true
}

/// Apply every pending config reload. Returns whether the store changed.
fn apply_reloads<S: PopupSurface, R: IconRegistrar>(
    watcher: &ConfigWatcher,
    store: &MonitorStore,
    persister: &StatePersister,
    owner: &TrayOwner<S, R>,
) -> bool {
    let mut changed = false;
    while let Some(config) = watcher.try_next() {
        changed |= apply_reload(config, store, persister, owner);
    }
    changed
}

fn run_console(
    store: Arc<MonitorStore>,
    persister: Arc<StatePersister>,
    watcher: ConfigWatcher,
    tooltip: &str,
) -> Result<()> {
    let surface = ConsoleSurface::new()?;
    let controller = MenuController::new(surface, store.clone(), store.clone());
    controller
        .notifier()
        .set_on_session_boundary(Some(session_boundary_callback()));

    let mut owner = TrayOwner::new(
        ConsoleIcon::default(),
        controller,
        tooltip,
        Some(state_changed_callback(store.clone(), persister.clone())),
    )?;

    if let Some(controller) = owner.controller() {
        controller.surface().print_help();
    }

    while !owner.is_finished() {
        // Reloads land between commands; the prompt blocks until the next one
        apply_reloads(&watcher, &store, &persister, &owner);

        let Some(controller) = owner.controller() else {
            break;
        };

        match controller.surface().read_input() {
            ConsoleInput::Event(event) => {
                owner.handle(event);
            }
            ConsoleInput::Quit => break,
            ConsoleInput::Unknown(line) => {
                println!("Unknown command: {}", line);
                controller.surface().print_help();
            }
        }
    }

    owner.shutdown();
    info!("Dimmer shutdown complete");
    Ok(())
}

#[cfg(windows)]
fn run_native(
    store: Arc<MonitorStore>,
    persister: Arc<StatePersister>,
    watcher: ConfigWatcher,
    tooltip: &str,
) -> Result<()> {
    use dimmer_tray::platform::win32::{pump_messages, tray_activations, NativeTrayIcon, Win32Surface};
    use dimmer_tray::tray::SessionOutcome;
    use std::time::Duration;

    let (surface, display_events) = Win32Surface::new()?;
    let controller = MenuController::new(surface, store.clone(), store.clone());
    controller
        .notifier()
        .set_on_session_boundary(Some(session_boundary_callback()));

    let mut owner = TrayOwner::new(
        NativeTrayIcon::new(strongest_bucket(&store)),
        controller,
        tooltip,
        Some(state_changed_callback(store.clone(), persister.clone())),
    )?;

    debug!("Tray ready, processing events...");

    while !owner.is_finished() {
        if !pump_messages() {
            debug!("WM_QUIT received");
            break;
        }

        if tray_activations().count() > 0 {
            if let Some(SessionOutcome::Changed) = owner.handle(SurfaceEvent::Activated) {
                let dim = strongest_bucket(&store);
                owner.registrar_mut().set_dim_level(dim);
            }

            // Clicks made while the menu was open are dropped, not replayed
            let stale = tray_activations().count();
            if stale > 0 {
                debug!("Dropped {} activations received during the menu session", stale);
            }
        }

        while let Ok(event) = display_events.try_recv() {
            owner.handle(event);
        }

        if let Some(config) = watcher.next_timeout(Duration::from_millis(50)) {
            let applied = apply_reload(config, &store, &persister, &owner);
            if apply_reloads(&watcher, &store, &persister, &owner) || applied {
                let dim = strongest_bucket(&store);
                owner.registrar_mut().set_dim_level(dim);
            }
        }
    }

    owner.shutdown();
    info!("Dimmer shutdown complete");
    Ok(())
}
