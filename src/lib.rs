//! `rawtrail`: live mouse-pointer capture for visualization front-ends.
//!
//! A worker thread obtains pointer data through the best strategy the OS allows
//! (native raw input, simplified raw input, then cursor polling), decodes it into
//! [`PointerEvent`]s and hands them to the consumer thread over a non-blocking,
//! drop-oldest delivery queue.
//!
//! Start with [`CaptureAdapter`]. Tests and demos drive it through
//! [`backends::virtual_input::VirtualPointer`].

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backends;
pub mod capture;
pub mod config;
pub mod decode;
pub mod device;
pub mod error;
pub mod event;
pub mod logger;
pub mod queue;
pub mod state;
pub mod trace;

pub use capture::CaptureAdapter;
pub use config::CaptureConfig;
pub use device::{CursorSample, CursorSampler, PointerBackend, PushSource};
pub use error::{CaptureError, ConfigError, TraceError};
pub use event::*;
pub use queue::{event_queue, EventReceiver, EventSender, QueueStats};
pub use state::{CapturePhase, CaptureState, Strategy};
