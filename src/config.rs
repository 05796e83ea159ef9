//! Capture configuration.
//!
//! Every field has a default, so an empty TOML document is a valid config:
//!
//! ```toml
//! queue_capacity = 1024        # 0 = unbounded (lossless)
//! poll_interval_ms = 8
//! pump_timeout_ms = 10
//! join_timeout_ms = 500
//! startup_timeout_ms = 1000
//! activity_report_secs = 5
//! native_raw_input = true
//! simplified_raw_input = true
//! trace_capacity = 5000
//! ```

use crate::error::ConfigError;
use crate::queue::DEFAULT_CAPACITY;
use crate::state::Strategy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CaptureConfig {
    /// Delivery queue bound. `0` selects an unbounded queue.
    pub queue_capacity: usize,
    /// Polling fallback sample interval.
    pub poll_interval_ms: u64,
    /// Longest a push source may block before the worker re-checks the stop flag.
    pub pump_timeout_ms: u64,
    /// Bounded wait for the worker in `stop()`.
    pub join_timeout_ms: u64,
    /// Bounded wait in `start()` for the worker to settle on a strategy.
    pub startup_timeout_ms: u64,
    /// Quiet period after which a push strategy logs an activity report. `0` disables.
    pub activity_report_secs: u64,
    /// Try native raw-input registration.
    pub native_raw_input: bool,
    /// Try simplified raw-input registration.
    pub simplified_raw_input: bool,
    /// Points kept by a [`PointerTrace`](crate::trace::PointerTrace).
    pub trace_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_CAPACITY,
            poll_interval_ms: 8,
            pump_timeout_ms: 10,
            join_timeout_ms: 500,
            startup_timeout_ms: 1000,
            activity_report_secs: 5,
            native_raw_input: true,
            simplified_raw_input: true,
            trace_capacity: 5000,
        }
    }
}

impl CaptureConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: CaptureConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be > 0".into()));
        }
        if self.pump_timeout_ms == 0 {
            return Err(ConfigError::Invalid("pump_timeout_ms must be > 0".into()));
        }
        if self.join_timeout_ms == 0 {
            return Err(ConfigError::Invalid("join_timeout_ms must be > 0".into()));
        }
        if self.trace_capacity == 0 {
            return Err(ConfigError::Invalid("trace_capacity must be > 0".into()));
        }
        Ok(())
    }

    /// Queue bound as passed to [`event_queue`](crate::queue::event_queue).
    pub fn queue_bound(&self) -> Option<usize> {
        (self.queue_capacity > 0).then_some(self.queue_capacity)
    }

    // Never below 1 ms, even for configs built in code without `validate`.

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn pump_timeout(&self) -> Duration {
        Duration::from_millis(self.pump_timeout_ms.max(1))
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_millis(self.join_timeout_ms.max(1))
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_millis(self.startup_timeout_ms)
    }

    pub fn activity_report_interval(&self) -> Option<Duration> {
        (self.activity_report_secs > 0).then(|| Duration::from_secs(self.activity_report_secs))
    }

    /// Whether `strategy` should be attempted. Polling is always enabled.
    pub fn allows(&self, strategy: Strategy) -> bool {
        match strategy {
            Strategy::NativeRawInput => self.native_raw_input,
            Strategy::SimplifiedRawInput => self.simplified_raw_input,
            Strategy::Polling => true,
        }
    }
}
