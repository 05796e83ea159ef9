//! Logging helpers.
//!
//! The library only emits `tracing` events; installing a subscriber is up to the
//! host. [`init_tracing`] is the one demos and small tools use.

use crate::event::PointerEvent;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install a fmt subscriber filtered by `RUST_LOG`, or by `default_filter` when
/// `RUST_LOG` is unset or invalid. Returns `false` if a global subscriber was
/// already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Consumer that logs every drained event at `info` and keeps per-kind counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EventLogger {
    pub moves: u64,
    pub buttons: u64,
    pub wheels: u64,
}

impl EventLogger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, event: &PointerEvent) {
        match event {
            PointerEvent::Movement(_) => self.moves += 1,
            PointerEvent::Button(_) => self.buttons += 1,
            PointerEvent::Wheel(_) => self.wheels += 1,
        }
        tracing::info!(target: "rawtrail::events", "{event}");
    }

    pub fn log_all<'a>(&mut self, events: impl IntoIterator<Item = &'a PointerEvent>) {
        for ev in events {
            self.log(ev);
        }
    }

    pub fn total(&self) -> u64 {
        self.moves + self.buttons + self.wheels
    }
}
