//! Platform interaction surfaces

pub mod console;
#[cfg(windows)]
pub mod win32;
