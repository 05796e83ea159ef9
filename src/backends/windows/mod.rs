#![cfg(target_os = "windows")]

//! Windows pointer backend.
//!
//! - **Raw Input** (`raw_input`): native and simplified registration on a
//!   message-only window created by the capture worker.
//! - **Cursor polling** (`cursor`): `GetCursorPos` + `GetAsyncKeyState`.
//!
//! Most users should not touch these modules directly; construct the adapter with
//! [`CaptureAdapter::for_platform`](crate::capture::CaptureAdapter::for_platform).

mod cursor;
mod message_window;
pub(crate) mod raw_input;

use crate::device::{CursorSampler, PointerBackend, PushSource};
use crate::error::CaptureError;
use crate::state::Strategy;

#[derive(Debug, Default, Clone, Copy)]
pub struct WindowsPointer;

impl WindowsPointer {
    pub fn new() -> Self {
        Self
    }
}

impl PointerBackend for WindowsPointer {
    fn name(&self) -> &str {
        "windows"
    }

    fn register(&self, strategy: Strategy) -> Result<Box<dyn PushSource>, CaptureError> {
        let source = raw_input::RawInputSource::open(strategy)?;
        Ok(Box::new(source))
    }

    fn sampler(&self) -> Result<Box<dyn CursorSampler>, CaptureError> {
        Ok(Box::new(cursor::CursorPoller))
    }
}
