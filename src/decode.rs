//! Platform-independent decoding of raw mouse packets.
//!
//! Backends copy the OS packet into a [`RawMouseSample`] (same field layout as
//! Windows `RAWMOUSE`) and hand it to a [`MouseDecoder`], which turns it into
//! [`PointerEvent`]s. Keeping this step free of FFI lets it be tested anywhere and
//! lets the virtual backend go through exactly the same path as real hardware.
//!
//! ## Conventions
//! - Relative packets: `last_x/last_y` are deltas in raw counts.
//! - Absolute packets (`MOUSE_MOVE_ABSOLUTE`, e.g. tablets, remote desktop):
//!   `last_x/last_y` are positions normalized to `0..=65535`; the decoder reports
//!   the difference from the previous absolute packet in the same units.
//! - One packet can carry several button transitions plus a wheel turn; all of
//!   them are emitted.

use crate::event::{MouseButton, PointerEvent, WheelAxis};
use std::time::Instant;

/// `RAWMOUSE.usFlags`: coordinates are absolute.
pub const MOUSE_MOVE_ABSOLUTE: u16 = 0x0001;
/// `RAWMOUSE.usFlags`: absolute coordinates span the virtual desktop.
pub const MOUSE_VIRTUAL_DESKTOP: u16 = 0x0002;

pub const RI_MOUSE_LEFT_BUTTON_DOWN: u16 = 0x0001;
pub const RI_MOUSE_LEFT_BUTTON_UP: u16 = 0x0002;
pub const RI_MOUSE_RIGHT_BUTTON_DOWN: u16 = 0x0004;
pub const RI_MOUSE_RIGHT_BUTTON_UP: u16 = 0x0008;
pub const RI_MOUSE_MIDDLE_BUTTON_DOWN: u16 = 0x0010;
pub const RI_MOUSE_MIDDLE_BUTTON_UP: u16 = 0x0020;
pub const RI_MOUSE_BUTTON_4_DOWN: u16 = 0x0040;
pub const RI_MOUSE_BUTTON_4_UP: u16 = 0x0080;
pub const RI_MOUSE_BUTTON_5_DOWN: u16 = 0x0100;
pub const RI_MOUSE_BUTTON_5_UP: u16 = 0x0200;
pub const RI_MOUSE_WHEEL: u16 = 0x0400;
pub const RI_MOUSE_HWHEEL: u16 = 0x0800;

/// `(button, down flag, up flag)` in reporting order.
const BUTTON_FLAGS: [(MouseButton, u16, u16); 5] = [
    (MouseButton::Left, RI_MOUSE_LEFT_BUTTON_DOWN, RI_MOUSE_LEFT_BUTTON_UP),
    (MouseButton::Right, RI_MOUSE_RIGHT_BUTTON_DOWN, RI_MOUSE_RIGHT_BUTTON_UP),
    (MouseButton::Middle, RI_MOUSE_MIDDLE_BUTTON_DOWN, RI_MOUSE_MIDDLE_BUTTON_UP),
    (MouseButton::Back, RI_MOUSE_BUTTON_4_DOWN, RI_MOUSE_BUTTON_4_UP),
    (MouseButton::Forward, RI_MOUSE_BUTTON_5_DOWN, RI_MOUSE_BUTTON_5_UP),
];

/// Transition flag for `button` going down (`pressed`) or up.
pub fn button_flag(button: MouseButton, pressed: bool) -> u16 {
    BUTTON_FLAGS
        .iter()
        .find(|(b, _, _)| *b == button)
        .map(|&(_, down, up)| if pressed { down } else { up })
        .unwrap_or(0)
}

/// One raw mouse packet.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawMouseSample {
    /// `usFlags` (`MOUSE_MOVE_*`).
    pub flags: u16,
    /// `usButtonFlags` (`RI_MOUSE_*`).
    pub button_flags: u16,
    /// `usButtonData`; the signed wheel delta when a wheel flag is set.
    pub button_data: u16,
    pub last_x: i32,
    pub last_y: i32,
}

impl RawMouseSample {
    /// A relative motion packet.
    pub fn relative(dx: i32, dy: i32) -> Self {
        Self {
            last_x: dx,
            last_y: dy,
            ..Self::default()
        }
    }

    /// An absolute position packet (normalized `0..=65535` coordinates).
    pub fn absolute(x: i32, y: i32) -> Self {
        Self {
            flags: MOUSE_MOVE_ABSOLUTE,
            last_x: x,
            last_y: y,
            ..Self::default()
        }
    }

    /// A single button transition.
    pub fn button(button: MouseButton, pressed: bool) -> Self {
        Self {
            button_flags: button_flag(button, pressed),
            ..Self::default()
        }
    }

    /// A wheel turn.
    pub fn wheel(delta: i16, axis: WheelAxis) -> Self {
        let flag = match axis {
            WheelAxis::Vertical => RI_MOUSE_WHEEL,
            WheelAxis::Horizontal => RI_MOUSE_HWHEEL,
        };
        Self {
            button_flags: flag,
            button_data: delta as u16,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_absolute(&self) -> bool {
        self.flags & MOUSE_MOVE_ABSOLUTE != 0
    }
}

/// Stateful packet decoder (state is only needed for absolute devices).
#[derive(Debug, Default)]
pub struct MouseDecoder {
    last_absolute: Option<(i32, i32)>,
}

impl MouseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode one packet, appending events to `out`.
    pub fn decode(&mut self, sample: &RawMouseSample, at: Instant, out: &mut Vec<PointerEvent>) {
        let (dx, dy) = if sample.is_absolute() {
            let pos = (sample.last_x, sample.last_y);
            match self.last_absolute.replace(pos) {
                Some(prev) => (pos.0.saturating_sub(prev.0), pos.1.saturating_sub(prev.1)),
                // First absolute packet only sets the baseline.
                None => (0, 0),
            }
        } else {
            (sample.last_x, sample.last_y)
        };
        if dx != 0 || dy != 0 {
            out.push(PointerEvent::movement(dx, dy, at));
        }

        let flags = sample.button_flags;
        for &(button, down, up) in BUTTON_FLAGS.iter() {
            if flags & down != 0 {
                out.push(PointerEvent::button(button, true, at));
            }
            if flags & up != 0 {
                out.push(PointerEvent::button(button, false, at));
            }
        }

        let wheel = sample.button_data as i16 as i32;
        if flags & RI_MOUSE_WHEEL != 0 {
            out.push(PointerEvent::wheel(wheel, WheelAxis::Vertical, at));
        }
        if flags & RI_MOUSE_HWHEEL != 0 {
            out.push(PointerEvent::wheel(wheel, WheelAxis::Horizontal, at));
        }
    }

    /// Forget the absolute baseline (e.g. after re-registration).
    pub fn reset(&mut self) {
        self.last_absolute = None;
    }
}

/// Set of pressed buttons.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ButtonSet(u8);

impl ButtonSet {
    pub const fn empty() -> Self {
        ButtonSet(0)
    }

    /// From a HID-style bitmap (bit 0 = left … bit 4 = forward). Higher bits are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        ButtonSet(bits & 0x1F)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    #[inline]
    pub fn contains(self, button: MouseButton) -> bool {
        self.0 & button.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, button: MouseButton) {
        self.0 |= button.bit();
    }

    #[inline]
    pub fn remove(&mut self, button: MouseButton) {
        self.0 &= !button.bit();
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = MouseButton> {
        MouseButton::ALL.into_iter().filter(move |b| self.contains(*b))
    }
}

impl FromIterator<MouseButton> for ButtonSet {
    fn from_iter<I: IntoIterator<Item = MouseButton>>(iter: I) -> Self {
        let mut set = ButtonSet::empty();
        for b in iter {
            set.insert(b);
        }
        set
    }
}

/// Emit press/release events for every button that differs between two states.
pub fn button_edges(previous: ButtonSet, current: ButtonSet, at: Instant, out: &mut Vec<PointerEvent>) {
    for button in MouseButton::ALL {
        let was = previous.contains(button);
        let is = current.contains(button);
        if was != is {
            out.push(PointerEvent::button(button, is, at));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_one(decoder: &mut MouseDecoder, sample: RawMouseSample) -> Vec<PointerEvent> {
        let mut out = Vec::new();
        decoder.decode(&sample, Instant::now(), &mut out);
        out
    }

    #[test]
    fn relative_motion() {
        let mut d = MouseDecoder::new();
        let out = decode_one(&mut d, RawMouseSample::relative(-4, 7));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].delta(), Some((-4, 7)));
    }

    #[test]
    fn absolute_jump_across_the_range_saturates() {
        let mut d = MouseDecoder::new();
        decode_one(&mut d, RawMouseSample::absolute(i32::MIN, i32::MAX));
        let out = decode_one(&mut d, RawMouseSample::absolute(1, -1));
        assert_eq!(out[0].delta(), Some((i32::MAX, i32::MIN)));
    }

    #[test]
    fn zero_motion_emits_nothing() {
        let mut d = MouseDecoder::new();
        assert!(decode_one(&mut d, RawMouseSample::relative(0, 0)).is_empty());
    }

    #[test]
    fn absolute_packets_become_deltas() {
        let mut d = MouseDecoder::new();
        assert!(decode_one(&mut d, RawMouseSample::absolute(1000, 2000)).is_empty());
        let out = decode_one(&mut d, RawMouseSample::absolute(1300, 1900));
        assert_eq!(out[0].delta(), Some((300, -100)));

        d.reset();
        assert!(decode_one(&mut d, RawMouseSample::absolute(0, 0)).is_empty());
    }

    #[test]
    fn several_transitions_in_one_packet() {
        let mut d = MouseDecoder::new();
        let sample = RawMouseSample {
            button_flags: RI_MOUSE_LEFT_BUTTON_UP | RI_MOUSE_RIGHT_BUTTON_DOWN | RI_MOUSE_BUTTON_5_DOWN,
            last_x: 1,
            ..RawMouseSample::default()
        };
        let out = decode_one(&mut d, sample);
        let kinds: Vec<String> = out.iter().map(|e| e.to_string()).collect();
        assert_eq!(
            kinds,
            vec!["move Δ(+1, +0)", "button left up", "button right down", "button forward down"]
        );
    }

    #[test]
    fn wheel_data_is_signed() {
        let mut d = MouseDecoder::new();
        let out = decode_one(&mut d, RawMouseSample::wheel(-120, WheelAxis::Vertical));
        match out.as_slice() {
            [PointerEvent::Wheel(w)] => {
                assert_eq!(w.delta, -120);
                assert_eq!(w.axis, WheelAxis::Vertical);
            }
            other => panic!("unexpected {other:?}"),
        }

        let out = decode_one(&mut d, RawMouseSample::wheel(240, WheelAxis::Horizontal));
        assert!(matches!(out.as_slice(), [PointerEvent::Wheel(w)] if w.delta == 240 && w.axis == WheelAxis::Horizontal));
    }

    #[test]
    fn button_flag_round_trips_through_decoder() {
        let mut d = MouseDecoder::new();
        for button in MouseButton::ALL {
            for pressed in [true, false] {
                let out = decode_one(&mut d, RawMouseSample::button(button, pressed));
                assert!(matches!(out.as_slice(), [PointerEvent::Button(b)] if b.button == button && b.pressed == pressed));
            }
        }
    }

    #[test]
    fn edges_between_button_sets() {
        let prev: ButtonSet = [MouseButton::Left, MouseButton::Middle].into_iter().collect();
        let cur: ButtonSet = [MouseButton::Middle, MouseButton::Right].into_iter().collect();
        let mut out = Vec::new();
        button_edges(prev, cur, Instant::now(), &mut out);
        let kinds: Vec<String> = out.iter().map(|e| e.to_string()).collect();
        assert_eq!(kinds, vec!["button left up", "button right down"]);

        out.clear();
        button_edges(cur, cur, Instant::now(), &mut out);
        assert!(out.is_empty());
    }
}
