//! Pointer events carried by the delivery queue.
//!
//! rawtrail represents pointer activity as small, immutable deltas stamped with a
//! monotonic capture time. Every event is produced by the capture worker and
//! consumed exactly once by the consumer loop (or dropped when the queue is cleared
//! or overflows).
//!
//! ## Units
//! - **Movement:** raw device counts as reported by the OS. On the polling path the
//!   deltas are screen pixels computed from consecutive cursor positions.
//! - **Wheel:** raw wheel units, typically `±120` per detent.
//!
//! Deltas are *not* clamped at screen edges; that is the point of raw capture.

use std::fmt;
use std::time::Instant;

/// Relative pointer motion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MovementEvent {
    /// Horizontal delta, positive to the right.
    pub delta_x: i32,
    /// Vertical delta, positive downwards.
    pub delta_y: i32,
    /// Capture time (monotonic).
    pub timestamp: Instant,
}

/// Mouse buttons rawtrail reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    /// XBUTTON1 (usually "back").
    Back,
    /// XBUTTON2 (usually "forward").
    Forward,
}

impl MouseButton {
    /// All buttons in reporting order.
    pub const ALL: [MouseButton; 5] = [
        MouseButton::Left,
        MouseButton::Right,
        MouseButton::Middle,
        MouseButton::Back,
        MouseButton::Forward,
    ];

    /// Bit used for this button inside a [`ButtonSet`](crate::decode::ButtonSet).
    #[inline]
    pub const fn bit(self) -> u8 {
        match self {
            MouseButton::Left => 0x01,
            MouseButton::Right => 0x02,
            MouseButton::Middle => 0x04,
            MouseButton::Back => 0x08,
            MouseButton::Forward => 0x10,
        }
    }
}

impl fmt::Display for MouseButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MouseButton::Left => "left",
            MouseButton::Right => "right",
            MouseButton::Middle => "middle",
            MouseButton::Back => "back",
            MouseButton::Forward => "forward",
        };
        f.write_str(s)
    }
}

/// A button transitioned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: MouseButton,
    /// `true` on press, `false` on release.
    pub pressed: bool,
    pub timestamp: Instant,
}

/// Which wheel turned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WheelAxis {
    Vertical,
    Horizontal,
}

/// Wheel rotation in raw wheel units.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WheelEvent {
    pub delta: i32,
    pub axis: WheelAxis,
    pub timestamp: Instant,
}

/// Anything the capture worker can deliver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerEvent {
    Movement(MovementEvent),
    Button(ButtonEvent),
    Wheel(WheelEvent),
}

impl PointerEvent {
    #[inline]
    pub fn movement(delta_x: i32, delta_y: i32, timestamp: Instant) -> Self {
        PointerEvent::Movement(MovementEvent {
            delta_x,
            delta_y,
            timestamp,
        })
    }

    #[inline]
    pub fn button(button: MouseButton, pressed: bool, timestamp: Instant) -> Self {
        PointerEvent::Button(ButtonEvent {
            button,
            pressed,
            timestamp,
        })
    }

    #[inline]
    pub fn wheel(delta: i32, axis: WheelAxis, timestamp: Instant) -> Self {
        PointerEvent::Wheel(WheelEvent {
            delta,
            axis,
            timestamp,
        })
    }

    /// Capture time of the wrapped event.
    pub fn timestamp(&self) -> Instant {
        match self {
            PointerEvent::Movement(m) => m.timestamp,
            PointerEvent::Button(b) => b.timestamp,
            PointerEvent::Wheel(w) => w.timestamp,
        }
    }

    /// Movement delta, if this is a movement event.
    pub fn delta(&self) -> Option<(i32, i32)> {
        match self {
            PointerEvent::Movement(m) => Some((m.delta_x, m.delta_y)),
            _ => None,
        }
    }
}

impl fmt::Display for PointerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointerEvent::Movement(m) => write!(f, "move Δ({:+}, {:+})", m.delta_x, m.delta_y),
            PointerEvent::Button(b) => {
                let state = if b.pressed { "down" } else { "up" };
                write!(f, "button {} {}", b.button, state)
            }
            PointerEvent::Wheel(w) => match w.axis {
                WheelAxis::Vertical => write!(f, "wheel Δ{:+}", w.delta),
                WheelAxis::Horizontal => write!(f, "hwheel Δ{:+}", w.delta),
            },
        }
    }
}
