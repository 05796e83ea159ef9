//! Scriptable in-process pointer backend.
//!
//! [`VirtualPointer`] behaves like an OS backend whose behavior the host controls:
//! raw packets are injected as if they came from `WM_INPUT`, the virtual cursor
//! can be moved for the polling path, and each registration strategy can be made
//! to fail. It also records what the capture worker asked of it (registration
//! order, unregistrations, cursor samples), which is what the tests assert on.
//!
//! Handles are cheap clones sharing one device.

use crate::decode::{ButtonSet, MouseDecoder, RawMouseSample};
use crate::device::{CursorSample, CursorSampler, PointerBackend, PushSource};
use crate::error::CaptureError;
use crate::event::{MouseButton, PointerEvent, WheelAxis};
use crate::state::Strategy;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Default)]
struct Inner {
    failing: Vec<Strategy>,
    pending: VecDeque<RawMouseSample>,
    cursor: CursorSample,
    device_lost: bool,
    disconnect_pending: bool,
    attempts: Vec<Strategy>,
    active: Option<Strategy>,
    unregistered: usize,
    abandoned: usize,
    samples_taken: u64,
}

#[derive(Default)]
struct Shared {
    inner: Mutex<Inner>,
    wake: Condvar,
}

/// Virtual pointer device.
#[derive(Clone, Default)]
pub struct VirtualPointer {
    shared: Arc<Shared>,
}

impl VirtualPointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make registration with `strategy` fail from now on.
    pub fn fail_registration(&self, strategy: Strategy) {
        let mut inner = self.shared.inner.lock();
        if !inner.failing.contains(&strategy) {
            inner.failing.push(strategy);
        }
    }

    /// Queue a raw packet for the active push registration.
    pub fn feed(&self, sample: RawMouseSample) {
        self.shared.inner.lock().pending.push_back(sample);
        self.shared.wake.notify_all();
    }

    /// Convenience: relative motion packet.
    pub fn inject_move(&self, dx: i32, dy: i32) {
        self.feed(RawMouseSample::relative(dx, dy));
    }

    pub fn inject_button(&self, button: MouseButton, pressed: bool) {
        self.feed(RawMouseSample::button(button, pressed));
    }

    pub fn inject_wheel(&self, delta: i16) {
        self.feed(RawMouseSample::wheel(delta, WheelAxis::Vertical));
    }

    /// Place the virtual cursor (polling path).
    pub fn move_cursor_to(&self, x: i32, y: i32) {
        let mut inner = self.shared.inner.lock();
        inner.cursor.x = x;
        inner.cursor.y = y;
    }

    pub fn move_cursor_by(&self, dx: i32, dy: i32) {
        let mut inner = self.shared.inner.lock();
        inner.cursor.x += dx;
        inner.cursor.y += dy;
    }

    pub fn press_button(&self, button: MouseButton) {
        self.shared.inner.lock().cursor.buttons.insert(button);
    }

    pub fn release_button(&self, button: MouseButton) {
        self.shared.inner.lock().cursor.buttons.remove(button);
    }

    pub fn set_buttons(&self, buttons: ButtonSet) {
        self.shared.inner.lock().cursor.buttons = buttons;
    }

    /// The active push registration fails on its next pump.
    pub fn disconnect(&self) {
        self.shared.inner.lock().disconnect_pending = true;
        self.shared.wake.notify_all();
    }

    /// The cursor can no longer be read.
    pub fn lose_device(&self) {
        self.shared.inner.lock().device_lost = true;
    }

    /// Every `register` call so far, including failed ones.
    pub fn registration_attempts(&self) -> Vec<Strategy> {
        self.shared.inner.lock().attempts.clone()
    }

    pub fn active_registration(&self) -> Option<Strategy> {
        self.shared.inner.lock().active
    }

    pub fn unregister_count(&self) -> usize {
        self.shared.inner.lock().unregistered
    }

    /// Sources dropped by a worker whose session had already been replaced.
    pub fn abandon_count(&self) -> usize {
        self.shared.inner.lock().abandoned
    }

    /// Cursor samples taken by the polling path.
    pub fn samples_taken(&self) -> u64 {
        self.shared.inner.lock().samples_taken
    }

    /// Injected packets not yet picked up.
    pub fn pending(&self) -> usize {
        self.shared.inner.lock().pending.len()
    }
}

impl PointerBackend for VirtualPointer {
    fn name(&self) -> &str {
        "virtual"
    }

    fn register(&self, strategy: Strategy) -> Result<Box<dyn PushSource>, CaptureError> {
        if !strategy.is_push() {
            return Err(CaptureError::registration(strategy, "not a push strategy"));
        }

        let mut inner = self.shared.inner.lock();
        inner.attempts.push(strategy);
        if inner.failing.contains(&strategy) {
            return Err(CaptureError::registration(strategy, "simulated registration failure"));
        }
        inner.active = Some(strategy);

        Ok(Box::new(VirtualSource {
            shared: Arc::clone(&self.shared),
            decoder: MouseDecoder::new(),
            batch: Vec::new(),
        }))
    }

    fn sampler(&self) -> Result<Box<dyn CursorSampler>, CaptureError> {
        if self.shared.inner.lock().device_lost {
            return Err(CaptureError::DeviceUnavailable("virtual pointer removed".into()));
        }
        Ok(Box::new(VirtualSampler {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct VirtualSource {
    shared: Arc<Shared>,
    decoder: MouseDecoder,
    batch: Vec<PointerEvent>,
}

impl PushSource for VirtualSource {
    fn pump(&mut self, timeout: Duration, sink: &mut dyn FnMut(PointerEvent)) -> Result<(), CaptureError> {
        {
            let mut inner = self.shared.inner.lock();
            if inner.pending.is_empty() && !inner.disconnect_pending {
                self.shared.wake.wait_for(&mut inner, timeout);
            }
            if std::mem::take(&mut inner.disconnect_pending) {
                return Err(CaptureError::SourceLost("virtual pointer disconnected".into()));
            }
            let now = Instant::now();
            while let Some(sample) = inner.pending.pop_front() {
                self.decoder.decode(&sample, now, &mut self.batch);
            }
        }

        for ev in self.batch.drain(..) {
            sink(ev);
        }
        Ok(())
    }

    fn unregister(&mut self) {
        let mut inner = self.shared.inner.lock();
        inner.active = None;
        inner.unregistered += 1;
    }

    fn abandon(&mut self) {
        self.shared.inner.lock().abandoned += 1;
    }
}

struct VirtualSampler {
    shared: Arc<Shared>,
}

impl CursorSampler for VirtualSampler {
    fn sample(&mut self) -> Result<CursorSample, CaptureError> {
        let mut inner = self.shared.inner.lock();
        inner.samples_taken += 1;
        if inner.device_lost {
            return Err(CaptureError::DeviceUnavailable("virtual pointer removed".into()));
        }
        Ok(inner.cursor)
    }
}
