#![cfg(target_os = "windows")]

//! Cursor polling for the last-resort strategy.

use crate::decode::ButtonSet;
use crate::device::{CursorSample, CursorSampler};
use crate::error::CaptureError;
use crate::event::MouseButton;
use windows_sys::Win32::Foundation::{GetLastError, POINT};
use windows_sys::Win32::UI::Input::KeyboardAndMouse::{
    GetAsyncKeyState, VIRTUAL_KEY, VK_LBUTTON, VK_MBUTTON, VK_RBUTTON, VK_XBUTTON1, VK_XBUTTON2,
};
use windows_sys::Win32::UI::WindowsAndMessaging::GetCursorPos;

const BUTTON_KEYS: [(MouseButton, VIRTUAL_KEY); 5] = [
    (MouseButton::Left, VK_LBUTTON),
    (MouseButton::Right, VK_RBUTTON),
    (MouseButton::Middle, VK_MBUTTON),
    (MouseButton::Back, VK_XBUTTON1),
    (MouseButton::Forward, VK_XBUTTON2),
];

#[derive(Debug, Default)]
pub(crate) struct CursorPoller;

impl CursorSampler for CursorPoller {
    fn sample(&mut self) -> Result<CursorSample, CaptureError> {
        let mut pt = POINT { x: 0, y: 0 };
        if unsafe { GetCursorPos(&mut pt) } == 0 {
            let code = unsafe { GetLastError() };
            return Err(CaptureError::DeviceUnavailable(format!("GetCursorPos failed (error {code})")));
        }

        // High bit set = key currently down.
        let buttons: ButtonSet = BUTTON_KEYS
            .iter()
            .filter(|(_, vk)| unsafe { GetAsyncKeyState(*vk as i32) } < 0)
            .map(|(b, _)| *b)
            .collect();

        Ok(CursorSample {
            x: pt.x,
            y: pt.y,
            buttons,
        })
    }
}
