//! Windows Raw Input mouse registration and `WM_INPUT` parsing.
//!
//! ## Strategies
//! - **native**: `RIDEV_INPUTSINK` on a message-only window. Packets arrive even
//!   when no window of this process has focus.
//! - **simplified**: default flags on the same window. Packets only arrive while
//!   the process is in the foreground, but registration succeeds in environments
//!   that refuse background sinks.
//!
//! ## Conventions
//! - Payloads are copied out of `GetRawInputData` into a [`RawMouseSample`]; all
//!   interpretation (button flags, wheel sign, absolute devices) happens in
//!   [`crate::decode`].
//! - Non-mouse payloads are ignored.

#![cfg(target_os = "windows")]

use super::message_window::MessageWindow;
use crate::decode::{MouseDecoder, RawMouseSample};
use crate::device::PushSource;
use crate::error::CaptureError;
use crate::event::PointerEvent;
use crate::state::Strategy;
use core::ffi::c_void;
use std::time::{Duration, Instant};
use windows_sys::Win32::Foundation::{GetLastError, HWND};
use windows_sys::Win32::UI::Input::*;
use windows_sys::Win32::UI::WindowsAndMessaging::WM_INPUT;

/// HID usage page "Generic Desktop".
const HID_USAGE_PAGE_GENERIC: u16 = 0x01;
/// HID usage "Mouse" on the generic desktop page.
const HID_USAGE_GENERIC_MOUSE: u16 = 0x02;

/// Registration flags for a push strategy.
fn strategy_flags(strategy: Strategy) -> Option<RAWINPUTDEVICE_FLAGS> {
    match strategy {
        Strategy::NativeRawInput => Some(RIDEV_INPUTSINK),
        Strategy::SimplifiedRawInput => Some(0),
        Strategy::Polling => None,
    }
}

fn register_mouse(hwnd: HWND, flags: RAWINPUTDEVICE_FLAGS) -> Result<(), u32> {
    let device = RAWINPUTDEVICE {
        usUsagePage: HID_USAGE_PAGE_GENERIC,
        usUsage: HID_USAGE_GENERIC_MOUSE,
        dwFlags: flags,
        hwndTarget: hwnd,
    };
    let ok = unsafe {
        RegisterRawInputDevices(&device, 1, core::mem::size_of::<RAWINPUTDEVICE>() as u32)
    };
    if ok == 0 {
        Err(unsafe { GetLastError() })
    } else {
        Ok(())
    }
}

fn unregister_mouse() -> Result<(), u32> {
    // RIDEV_REMOVE requires a null target.
    register_mouse(core::ptr::null_mut(), RIDEV_REMOVE)
}

/// Read the mouse packet behind a `WM_INPUT` lparam.
pub(crate) fn read_wm_input(lparam: isize) -> Option<RawMouseSample> {
    unsafe {
        let mut size: u32 = 0;
        let r0 = GetRawInputData(
            lparam as _,
            RID_INPUT,
            core::ptr::null_mut(),
            &mut size,
            core::mem::size_of::<RAWINPUTHEADER>() as u32,
        );
        if r0 == u32::MAX || size == 0 {
            return None;
        }

        let mut buf = vec![0u8; size as usize];
        let r1 = GetRawInputData(
            lparam as _,
            RID_INPUT,
            buf.as_mut_ptr() as *mut c_void,
            &mut size,
            core::mem::size_of::<RAWINPUTHEADER>() as u32,
        );
        if r1 == u32::MAX {
            return None;
        }

        read_raw_input_bytes(&buf)
    }
}

/// Parse a `RID_INPUT` payload copied out during `WM_INPUT`.
pub(crate) fn read_raw_input_bytes(buf: &[u8]) -> Option<RawMouseSample> {
    let hdr_sz = core::mem::size_of::<RAWINPUTHEADER>();
    if buf.len() < hdr_sz + core::mem::size_of::<RAWMOUSE>() {
        return None;
    }

    unsafe {
        let hdr: RAWINPUTHEADER = core::ptr::read_unaligned(buf.as_ptr() as *const RAWINPUTHEADER);
        if hdr.dwType != RIM_TYPEMOUSE {
            return None;
        }
        let m: RAWMOUSE = core::ptr::read_unaligned(buf.as_ptr().add(hdr_sz) as *const RAWMOUSE);

        Some(RawMouseSample {
            flags: m.usFlags as u16,
            button_flags: m.Anonymous.Anonymous.usButtonFlags,
            button_data: m.Anonymous.Anonymous.usButtonData,
            last_x: m.lLastX,
            last_y: m.lLastY,
        })
    }
}

/// A live raw-input registration bound to a message-only window.
pub(crate) struct RawInputSource {
    strategy: Strategy,
    window: MessageWindow,
    decoder: MouseDecoder,
    batch: Vec<PointerEvent>,
    registered: bool,
}

impl RawInputSource {
    /// Create the window and register for mouse packets. Must run on the thread
    /// that will pump.
    pub(crate) fn open(strategy: Strategy) -> Result<Self, CaptureError> {
        let flags = strategy_flags(strategy)
            .ok_or_else(|| CaptureError::registration(strategy, "not a push strategy"))?;

        let window = MessageWindow::create()
            .map_err(|code| CaptureError::registration(strategy, format!("CreateWindowExW failed (error {code})")))?;

        register_mouse(window.hwnd(), flags).map_err(|code| {
            CaptureError::registration(strategy, format!("RegisterRawInputDevices failed (error {code})"))
        })?;

        Ok(Self {
            strategy,
            window,
            decoder: MouseDecoder::new(),
            batch: Vec::new(),
            registered: true,
        })
    }
}

impl PushSource for RawInputSource {
    fn pump(&mut self, timeout: Duration, sink: &mut dyn FnMut(PointerEvent)) -> Result<(), CaptureError> {
        let decoder = &mut self.decoder;
        let batch = &mut self.batch;
        self.window
            .pump(timeout, |msg| {
                if msg.message == WM_INPUT {
                    if let Some(sample) = read_wm_input(msg.lParam) {
                        decoder.decode(&sample, Instant::now(), batch);
                    }
                }
            })
            .map_err(|reason| CaptureError::SourceLost(format!("{}: {reason}", self.strategy)))?;

        for ev in self.batch.drain(..) {
            sink(ev);
        }
        Ok(())
    }

    fn unregister(&mut self) {
        if !std::mem::take(&mut self.registered) {
            return;
        }
        if let Err(code) = unregister_mouse() {
            tracing::warn!("RIDEV_REMOVE failed for {} (error {code})", self.strategy);
        }
    }

    fn abandon(&mut self) {
        // RIDEV_REMOVE is process-wide; leave it to the current session.
        if std::mem::take(&mut self.registered) {
            tracing::debug!("Leaving {} registration to the current session", self.strategy);
        }
    }
}

impl Drop for RawInputSource {
    fn drop(&mut self) {
        self.unregister();
    }
}
