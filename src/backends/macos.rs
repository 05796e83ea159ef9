//! macOS pointer backend: cursor polling only.
//!
//! There is no raw-input registration on macOS without an event tap (which needs
//! the Accessibility permission), so both push strategies are refused and the
//! adapter settles on polling.

use crate::decode::ButtonSet;
use crate::device::{CursorSample, CursorSampler, PointerBackend, PushSource};
use crate::error::CaptureError;
use crate::event::MouseButton;
use crate::state::Strategy;
use core_graphics::event::CGEvent;
use core_graphics::event_source::{CGEventSource, CGEventSourceStateID};

/// `kCGEventSourceStateCombinedSessionState`
const COMBINED_SESSION_STATE: i32 = 0;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventSourceButtonState(state_id: i32, button: u32) -> bool;
}

/// `(button, CGMouseButton)`; 3 and 4 are the side buttons.
const BUTTONS: [(MouseButton, u32); 5] = [
    (MouseButton::Left, 0),
    (MouseButton::Right, 1),
    (MouseButton::Middle, 2),
    (MouseButton::Back, 3),
    (MouseButton::Forward, 4),
];

#[derive(Debug, Default, Clone, Copy)]
pub struct MacPointer;

impl MacPointer {
    pub fn new() -> Self {
        Self
    }
}

impl PointerBackend for MacPointer {
    fn name(&self) -> &str {
        "macos"
    }

    fn register(&self, strategy: Strategy) -> Result<Box<dyn PushSource>, CaptureError> {
        Err(CaptureError::registration(strategy, "raw input is not available on macOS"))
    }

    fn sampler(&self) -> Result<Box<dyn CursorSampler>, CaptureError> {
        Ok(Box::new(CgCursor))
    }
}

struct CgCursor;

impl CursorSampler for CgCursor {
    fn sample(&mut self) -> Result<CursorSample, CaptureError> {
        let source = CGEventSource::new(CGEventSourceStateID::CombinedSessionState)
            .map_err(|_| CaptureError::DeviceUnavailable("CGEventSourceCreate failed".into()))?;
        let event = CGEvent::new(source)
            .map_err(|_| CaptureError::DeviceUnavailable("CGEventCreate failed".into()))?;
        let location = event.location();

        let buttons: ButtonSet = BUTTONS
            .iter()
            .filter(|(_, cg)| unsafe { CGEventSourceButtonState(COMBINED_SESSION_STATE, *cg) })
            .map(|(b, _)| *b)
            .collect();

        Ok(CursorSample {
            x: location.x.round() as i32,
            y: location.y.round() as i32,
            buttons,
        })
    }
}
