//! HID boot-protocol mice.
//!
//! Diagnostics only: the capture adapter never reads HID directly. This module
//! parses boot-protocol mouse reports (usable on any platform) and, on Windows
//! with the **`hid`** feature, enumerates mice through `hidapi` so a host can see
//! what the OS exposes and dump live reports.
//!
//! Boot report layout: `[buttons, dx, dy, (wheel)]`, deltas signed 8-bit.

use crate::decode::{button_edges, ButtonSet};
use crate::event::{PointerEvent, WheelAxis};
use std::time::Instant;

/// Raw wheel units per detent, matching raw-input wheel deltas.
pub const WHEEL_DELTA: i32 = 120;

/// One decoded boot-protocol mouse report.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BootMouseReport {
    pub buttons: ButtonSet,
    pub dx: i32,
    pub dy: i32,
    /// Detents; `None` when the report carries no wheel byte.
    pub wheel: Option<i32>,
}

/// Parse a boot-protocol report. Needs at least three bytes.
pub fn parse_boot_report(data: &[u8]) -> Option<BootMouseReport> {
    match data {
        [buttons, dx, dy, rest @ ..] => Some(BootMouseReport {
            buttons: ButtonSet::from_bits(*buttons),
            dx: *dx as i8 as i32,
            dy: *dy as i8 as i32,
            wheel: rest.first().map(|w| *w as i8 as i32),
        }),
        _ => None,
    }
}

impl BootMouseReport {
    /// Whether the report says anything (buttons held or motion).
    pub fn is_active(&self) -> bool {
        !self.buttons.is_empty() || self.dx != 0 || self.dy != 0 || self.wheel.unwrap_or(0) != 0
    }

    /// Events relative to the button state of the previous report.
    pub fn to_events(&self, previous: ButtonSet, at: Instant) -> Vec<PointerEvent> {
        let mut out = Vec::new();
        if self.dx != 0 || self.dy != 0 {
            out.push(PointerEvent::movement(self.dx, self.dy, at));
        }
        button_edges(previous, self.buttons, at, &mut out);
        if let Some(w) = self.wheel.filter(|w| *w != 0) {
            out.push(PointerEvent::wheel(w * WHEEL_DELTA, WheelAxis::Vertical, at));
        }
        out
    }
}

#[cfg(all(feature = "hid", target_os = "windows"))]
#[cfg_attr(docsrs, doc(cfg(all(feature = "hid", target_os = "windows"))))]
pub use self::discovery::{probe_mice, HidMouse, MouseInfo};

#[cfg(all(feature = "hid", target_os = "windows"))]
mod discovery {
    use super::{parse_boot_report, BootMouseReport};
    use crate::error::CaptureError;
    use hidapi::{DeviceInfo, HidApi, HidDevice};
    use std::time::Duration;

    /// Identity of a HID mouse as reported by `hidapi`.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub struct MouseInfo {
        pub vid: u16,
        pub pid: u16,
        pub usage_page: u16,
        pub usage: u16,
        pub product: Option<String>,
        pub manufacturer: Option<String>,
        pub path: String,
    }

    impl MouseInfo {
        fn from_info(info: &DeviceInfo) -> Self {
            Self {
                vid: info.vendor_id(),
                pid: info.product_id(),
                usage_page: info.usage_page(),
                usage: info.usage(),
                product: info.product_string().map(str::to_string),
                manufacturer: info.manufacturer_string().map(str::to_string),
                path: info.path().to_string_lossy().to_string(),
            }
        }
    }

    /// Generic Desktop / Mouse, or anything calling itself a mouse.
    fn is_mouse(info: &DeviceInfo) -> bool {
        if info.usage_page() == 0x01 && info.usage() == 0x02 {
            return true;
        }
        let named = |s: Option<&str>| s.is_some_and(|s| s.to_lowercase().contains("mouse"));
        named(info.product_string()) || named(info.manufacturer_string())
    }

    /// Every HID entry that looks like a mouse.
    pub fn probe_mice(api: &HidApi) -> Vec<MouseInfo> {
        api.device_list()
            .filter(|info| is_mouse(info))
            .map(MouseInfo::from_info)
            .collect()
    }

    /// An opened HID mouse.
    pub struct HidMouse {
        info: MouseInfo,
        raw: HidDevice,
    }

    impl HidMouse {
        pub fn open(api: &HidApi, info: &MouseInfo) -> Result<Self, CaptureError> {
            let entry = api
                .device_list()
                .find(|d| d.path().to_string_lossy() == info.path)
                .ok_or_else(|| CaptureError::DeviceUnavailable(format!("{} is gone", info.path)))?;
            let raw = entry
                .open_device(api)
                .map_err(|e| CaptureError::DeviceUnavailable(e.to_string()))?;
            Ok(Self {
                info: info.clone(),
                raw,
            })
        }

        pub fn info(&self) -> &MouseInfo {
            &self.info
        }

        /// Read one raw report into `buf`. `Ok(0)` on timeout.
        pub fn read_raw(&self, buf: &mut [u8], timeout: Duration) -> Result<usize, CaptureError> {
            let millis = timeout.as_millis().min(i32::MAX as u128) as i32;
            self.raw
                .read_timeout(buf, millis)
                .map_err(|e| CaptureError::SourceLost(e.to_string()))
        }

        /// Read and parse one report. `Ok(None)` on timeout or a short report.
        pub fn read_report(&self, timeout: Duration) -> Result<Option<BootMouseReport>, CaptureError> {
            let mut buf = [0u8; 64];
            let n = self.read_raw(&mut buf, timeout)?;
            Ok(parse_boot_report(&buf[..n]))
        }
    }
}
