//! Win32 interaction surface
//!
//! A hidden, off-screen tool window owns the popup menu. Tray clicks arrive
//! through `tray-icon`'s event channel; `WM_DISPLAYCHANGE` arrives on the
//! window and is forwarded through a channel sender stored in the window's
//! `GWLP_USERDATA`, so no process-wide handle map is needed.

use crossbeam::channel::{Receiver, Sender};
use std::sync::OnceLock;
use tracing::{debug, trace, warn};
use tray_icon::{MouseButton, MouseButtonState, TrayIconBuilder, TrayIconEvent};
use windows::core::{w, PCWSTR};
use windows::Win32::Foundation::{HINSTANCE, HWND, LPARAM, LRESULT, POINT, WPARAM};
use windows::Win32::System::LibraryLoader::GetModuleHandleW;
use windows::Win32::UI::WindowsAndMessaging::*;

use crate::menu::{MenuEntry, MenuItem, MenuSnapshot, OpacityBucket};
use crate::tray::icons::{generate_icon_bytes, ICON_SIZE};
use crate::tray::{IconRegistrar, Point, PopupSurface, SurfaceError, SurfaceEvent};

const CLASS_NAME: PCWSTR = w!("DimmerTrayMenuClass");
const WINDOW_TITLE: PCWSTR = w!("DimmerTrayMenuWindow");
const OFFSCREEN: i32 = -32000;

static WINDOW_CLASS: OnceLock<u16> = OnceLock::new();

unsafe extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    if msg == WM_DISPLAYCHANGE {
        let sender = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *const Sender<SurfaceEvent>;
        if let Some(sender) = sender.as_ref() {
            let _ = sender.try_send(SurfaceEvent::DisplayChanged);
        }
    }

    DefWindowProcW(hwnd, msg, wparam, lparam)
}

/// Hidden tool window that hosts the popup menu
pub struct Win32Surface {
    hwnd: HWND,
}

impl Win32Surface {
    /// Create the window. The receiver yields display-change events.
    pub fn new() -> Result<(Self, Receiver<SurfaceEvent>), SurfaceError> {
        let (tx, rx) = crossbeam::channel::unbounded();

        unsafe {
            let module = GetModuleHandleW(None).map_err(|e| SurfaceError::WindowCreation(e.to_string()))?;
            let instance: HINSTANCE = module.into();

            let atom = *WINDOW_CLASS.get_or_init(|| {
                let class = WNDCLASSW {
                    lpfnWndProc: Some(window_proc),
                    hInstance: instance,
                    lpszClassName: CLASS_NAME,
                    ..Default::default()
                };
                RegisterClassW(&class)
            });
            if atom == 0 {
                return Err(SurfaceError::ClassRegistration);
            }

            let hwnd = CreateWindowExW(
                WS_EX_TOOLWINDOW,
                CLASS_NAME,
                WINDOW_TITLE,
                WINDOW_STYLE(0),
                0,
                0,
                0,
                0,
                None,
                None,
                instance,
                None,
            );
            if hwnd.0 == 0 {
                return Err(SurfaceError::WindowCreation(windows::core::Error::from_win32().to_string()));
            }

            let sender = Box::into_raw(Box::new(tx));
            SetWindowLongPtrW(hwnd, GWLP_USERDATA, sender as isize);

            // Removes title and borders; must be shown for SetForegroundWindow to work
            SetWindowLongPtrW(hwnd, GWL_STYLE, 0);
            let _ = SetWindowPos(
                hwnd,
                None,
                OFFSCREEN,
                OFFSCREEN,
                50,
                50,
                SWP_FRAMECHANGED | SWP_SHOWWINDOW,
            );

            debug!("Tray surface window created");
            Ok((Self { hwnd }, rx))
        }
    }
}

impl Drop for Win32Surface {
    fn drop(&mut self) {
        unsafe {
            let sender = SetWindowLongPtrW(self.hwnd, GWLP_USERDATA, 0) as *mut Sender<SurfaceEvent>;
            if let Err(e) = DestroyWindow(self.hwnd) {
                warn!("Failed to destroy tray surface window: {}", e);
            }
            if !sender.is_null() {
                drop(Box::from_raw(sender));
            }
        }
        debug!("Tray surface window destroyed");
    }
}

/// Native menu built for one session and destroyed when dropped
struct NativeMenu {
    handle: HMENU,
}

impl NativeMenu {
    fn new() -> windows::core::Result<Self> {
        Ok(Self {
            handle: unsafe { CreatePopupMenu()? },
        })
    }

    fn build(snapshot: &MenuSnapshot) -> windows::core::Result<Self> {
        let root = Self::new()?;

        for entry in snapshot.entries() {
            match entry {
                MenuEntry::Submenu { label, items } => {
                    let submenu = Self::new()?;
                    for item in items {
                        submenu.append_item(item)?;
                    }
                    root.append(MF_POPUP, submenu.handle.0 as usize, label)?;
                    // Owned by the root from here on
                    std::mem::forget(submenu);
                }
                MenuEntry::Item(item) => root.append_item(item)?,
                MenuEntry::Separator => unsafe { AppendMenuW(root.handle, MF_SEPARATOR, 0, PCWSTR::null())? },
            }
        }

        Ok(root)
    }

    fn append_item(&self, item: &MenuItem) -> windows::core::Result<()> {
        let flags = if item.checked { MF_STRING | MF_CHECKED } else { MF_STRING };
        self.append(flags, item.id as usize, &item.label)
    }

    fn append(&self, flags: MENU_ITEM_FLAGS, id: usize, label: &str) -> windows::core::Result<()> {
        let wide: Vec<u16> = label.encode_utf16().chain(std::iter::once(0)).collect();
        unsafe { AppendMenuW(self.handle, flags, id, PCWSTR(wide.as_ptr())) }
    }
}

impl Drop for NativeMenu {
    fn drop(&mut self) {
        // Destroys attached submenus too
        unsafe {
            let _ = DestroyMenu(self.handle);
        }
    }
}

impl PopupSurface for Win32Surface {
    fn bring_to_foreground(&self) {
        unsafe {
            let _ = SetForegroundWindow(self.hwnd);
        }
    }

    fn cursor_position(&self) -> Point {
        let mut cursor = POINT::default();
        unsafe {
            if let Err(e) = GetCursorPos(&mut cursor) {
                warn!("GetCursorPos failed: {}", e);
            }
        }
        Point { x: cursor.x, y: cursor.y }
    }

    fn show_popup(&self, snapshot: &MenuSnapshot, at: Point) -> Option<u32> {
        let menu = match NativeMenu::build(snapshot) {
            Ok(menu) => menu,
            Err(e) => {
                warn!("Failed to build native menu: {}", e);
                return None;
            }
        };

        // TPM_RETURNCMD runs the modal loop here and returns the picked id
        let id = unsafe { TrackPopupMenuEx(menu.handle, TPM_RETURNCMD.0, at.x, at.y, self.hwnd, None) };
        trace!("TrackPopupMenuEx returned {}", id.0);

        u32::try_from(id.0).ok().filter(|id| *id != 0)
    }

    fn post_sync(&self) {
        unsafe {
            let _ = PostMessageW(self.hwnd, WM_NULL, WPARAM(0), LPARAM(0));
        }
    }

    fn request_shutdown(&self) {
        unsafe { PostQuitMessage(0) };
    }
}

/// Pump pending Windows messages. Returns `false` once `WM_QUIT` is seen.
pub fn pump_messages() -> bool {
    unsafe {
        let mut msg = MSG::default();
        while PeekMessageW(&mut msg, None, 0, 0, PM_REMOVE).as_bool() {
            if msg.message == WM_QUIT {
                return false;
            }
            let _ = TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
    true
}

/// Drain pending tray icon events, yielding one `Activated` per button release
pub fn tray_activations() -> impl Iterator<Item = SurfaceEvent> {
    let receiver = TrayIconEvent::receiver();

    std::iter::from_fn(move || receiver.try_recv().ok()).filter_map(|event| match event {
        TrayIconEvent::Click {
            button: MouseButton::Left | MouseButton::Right,
            button_state: MouseButtonState::Up,
            ..
        } => Some(SurfaceEvent::Activated),
        _ => None,
    })
}

/// Notification-area icon backed by `tray-icon`
pub struct NativeTrayIcon {
    dim: OpacityBucket,
    icon: Option<tray_icon::TrayIcon>,
}

impl NativeTrayIcon {
    pub fn new(dim: OpacityBucket) -> Self {
        Self { dim, icon: None }
    }

    /// Redraw the glyph for a new dimming level
    pub fn set_dim_level(&mut self, dim: OpacityBucket) {
        self.dim = dim;
        if let Some(tray) = self.icon.as_ref() {
            if let Ok(icon) = tray_icon::Icon::from_rgba(generate_icon_bytes(dim), ICON_SIZE, ICON_SIZE) {
                if let Err(e) = tray.set_icon(Some(icon)) {
                    warn!("Failed to update tray icon: {}", e);
                }
            }
        }
    }
}

impl IconRegistrar for NativeTrayIcon {
    fn register(&mut self, tooltip: &str) -> Result<(), SurfaceError> {
        let icon = tray_icon::Icon::from_rgba(generate_icon_bytes(self.dim), ICON_SIZE, ICON_SIZE)
            .map_err(|e| SurfaceError::Icon(e.to_string()))?;

        let tray = TrayIconBuilder::new()
            .with_icon(icon)
            .with_tooltip(tooltip)
            .build()
            .map_err(|e| SurfaceError::Icon(e.to_string()))?;

        self.icon = Some(tray);
        Ok(())
    }

    fn unregister(&mut self) {
        if let Some(tray) = self.icon.take() {
            // Hide explicitly to prevent ghost icons
            if let Err(e) = tray.set_visible(false) {
                warn!("Failed to hide tray icon: {}", e);
            }
            drop(tray);
            debug!("Tray icon removed");
        }
    }
}
