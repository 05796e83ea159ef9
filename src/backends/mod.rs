//! Pointer backends for `rawtrail`.
//!
//! Implementations of [`PointerBackend`](crate::device::PointerBackend) per
//! platform:
//! - **Windows**: raw input (native and simplified registration) plus cursor
//!   polling.
//! - **macOS**: cursor polling through CoreGraphics.
//! - anything else: no pointer access; capture ends in degraded polling.
//!
//! [`virtual_input::VirtualPointer`] is available everywhere and is what tests and
//! demos drive. [`hid`] holds boot-protocol mouse report parsing and, with the
//! **`hid`** feature on Windows, HID mouse discovery.

use crate::device::{CursorSampler, PointerBackend, PushSource};
use crate::error::CaptureError;
use crate::state::Strategy;
use std::sync::Arc;

pub mod hid;
pub mod virtual_input;

#[cfg(target_os = "windows")]
#[cfg_attr(docsrs, doc(cfg(target_os = "windows")))]
pub mod windows;

#[cfg(target_os = "macos")]
#[cfg_attr(docsrs, doc(cfg(target_os = "macos")))]
pub mod macos;

/// Backend for the platform this crate was built for.
pub fn platform_backend() -> Arc<dyn PointerBackend> {
    #[cfg(target_os = "windows")]
    {
        Arc::new(windows::WindowsPointer::new())
    }
    #[cfg(target_os = "macos")]
    {
        Arc::new(macos::MacPointer::new())
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Arc::new(Unsupported)
    }
}

/// Backend for platforms without pointer access.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

impl PointerBackend for Unsupported {
    fn name(&self) -> &str {
        "unsupported"
    }

    fn register(&self, strategy: Strategy) -> Result<Box<dyn PushSource>, CaptureError> {
        Err(CaptureError::registration(
            strategy,
            format!("raw input is not available on {}", std::env::consts::OS),
        ))
    }

    fn sampler(&self) -> Result<Box<dyn CursorSampler>, CaptureError> {
        Err(CaptureError::DeviceUnavailable(format!(
            "cursor position is not readable on {}",
            std::env::consts::OS
        )))
    }
}
