//! The OS seam.
//!
//! A [`PointerBackend`] knows how to obtain pointer data on one platform. The
//! capture worker asks it, in fallback order, for a [`PushSource`] (raw-input
//! registration) and finally for a [`CursorSampler`] (polling). Both are created
//! *on the worker thread*: on Windows raw input is tied to a window, and a window
//! is tied to the thread that created it.

use crate::decode::ButtonSet;
use crate::error::CaptureError;
use crate::event::PointerEvent;
use crate::state::Strategy;
use std::time::Duration;

/// Platform access to the pointer.
pub trait PointerBackend: Send + Sync {
    /// Short name for logs (e.g. `"windows"`, `"virtual"`).
    fn name(&self) -> &str;

    /// Register for pushed pointer packets using `strategy`.
    ///
    /// Only push strategies are meaningful; `Strategy::Polling` must be rejected with
    /// `RegistrationFailure`.
    fn register(&self, strategy: Strategy) -> Result<Box<dyn PushSource>, CaptureError>;

    /// Open a cursor sampler for the polling fallback.
    fn sampler(&self) -> Result<Box<dyn CursorSampler>, CaptureError>;
}

/// An active push registration.
pub trait PushSource {
    /// Wait up to `timeout` for packets and forward every decoded event to `sink`.
    ///
    /// Returning `Ok` with nothing delivered is normal (timeout). An `Err` means the
    /// source is unusable; the worker unregisters it and falls back.
    fn pump(&mut self, timeout: Duration, sink: &mut dyn FnMut(PointerEvent)) -> Result<(), CaptureError>;

    /// Release the OS registration. Called at most once before the source is dropped.
    fn unregister(&mut self);

    /// Drop the source without touching the OS registration, which by now belongs
    /// to a newer session. Called instead of [`unregister`](Self::unregister).
    fn abandon(&mut self) {}
}

/// Cursor position and pressed buttons at one instant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CursorSample {
    pub x: i32,
    pub y: i32,
    pub buttons: ButtonSet,
}

/// Reads the cursor for the polling fallback.
pub trait CursorSampler {
    fn sample(&mut self) -> Result<CursorSample, CaptureError>;
}
