//! Hidden message-only window owned by the capture worker.
//!
//! Raw input is delivered as `WM_INPUT` to a window, and messages go to the
//! thread that created the window, so this type is created, pumped and dropped
//! on the worker thread. It is `!Send` through its `HWND`.

#![cfg(target_os = "windows")]

use std::time::Duration;
use windows_sys::Win32::Foundation::{GetLastError, HWND};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::UI::WindowsAndMessaging::*;

const ERROR_CLASS_ALREADY_EXISTS: u32 = 1410;
const WAIT_FAILED: u32 = 0xFFFF_FFFF;

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

pub(crate) struct MessageWindow {
    hwnd: HWND,
}

impl MessageWindow {
    /// Register the window class (once per process) and create the window.
    /// Returns the Win32 error code on failure.
    pub(crate) fn create() -> Result<Self, u32> {
        let class_name = wide("rawtrail_capture_window");
        unsafe {
            let instance = GetModuleHandleW(core::ptr::null());

            let mut class: WNDCLASSW = core::mem::zeroed();
            class.lpfnWndProc = Some(DefWindowProcW);
            class.hInstance = instance;
            class.lpszClassName = class_name.as_ptr();
            if RegisterClassW(&class) == 0 {
                let code = GetLastError();
                if code != ERROR_CLASS_ALREADY_EXISTS {
                    return Err(code);
                }
            }

            let hwnd = CreateWindowExW(
                0,
                class_name.as_ptr(),
                class_name.as_ptr(),
                0,
                0,
                0,
                0,
                0,
                HWND_MESSAGE,
                core::ptr::null_mut(),
                instance,
                core::ptr::null(),
            );
            if hwnd.is_null() {
                return Err(GetLastError());
            }
            Ok(Self { hwnd })
        }
    }

    pub(crate) fn hwnd(&self) -> HWND {
        self.hwnd
    }

    /// Wait up to `timeout` for messages, then drain the thread queue.
    ///
    /// `on_message` sees every message before it is dispatched.
    pub(crate) fn pump(&self, timeout: Duration, mut on_message: impl FnMut(&MSG)) -> Result<(), String> {
        let millis = timeout.as_millis().min(u32::MAX as u128) as u32;
        unsafe {
            let waited = MsgWaitForMultipleObjects(0, core::ptr::null(), 0, millis, QS_ALLINPUT);
            if waited == WAIT_FAILED {
                return Err(format!("MsgWaitForMultipleObjects failed (error {})", GetLastError()));
            }

            let mut msg: MSG = core::mem::zeroed();
            while PeekMessageW(&mut msg, core::ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
                if msg.message == WM_QUIT {
                    return Err("message loop received WM_QUIT".into());
                }
                on_message(&msg);
                TranslateMessage(&msg);
                DispatchMessageW(&msg);
            }
        }
        Ok(())
    }
}

impl Drop for MessageWindow {
    fn drop(&mut self) {
        unsafe {
            DestroyWindow(self.hwnd);
        }
    }
}
