//! Error types.
//!
//! None of these cross into the consumer loop. The capture adapter logs them,
//! records the last one in [`CaptureState`](crate::state::CaptureState) and
//! degrades instead of failing.

use crate::state::Strategy;
use std::time::Duration;
use thiserror::Error;

/// Failures inside the capture path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The OS refused a registration strategy. Recoverable: triggers fallback.
    #[error("{strategy} registration failed: {reason}")]
    RegistrationFailure { strategy: Strategy, reason: String },

    /// A registered push source stopped working mid-session. Triggers fallback.
    #[error("push source lost: {0}")]
    SourceLost(String),

    /// The pointer cannot be read at all. Reported once; capture stays degraded.
    #[error("pointer device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The worker did not exit within the join timeout. Cleanup proceeds anyway.
    #[error("capture worker did not exit within {0:?}")]
    ThreadJoinTimeout(Duration),
}

impl CaptureError {
    pub(crate) fn registration(strategy: Strategy, reason: impl Into<String>) -> Self {
        CaptureError::RegistrationFailure {
            strategy,
            reason: reason.into(),
        }
    }
}

/// Failures loading a [`CaptureConfig`](crate::config::CaptureConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Failures exporting a [`PointerTrace`](crate::trace::PointerTrace).
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("failed to write trace: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode trace: {0}")]
    Json(#[from] serde_json::Error),
}
