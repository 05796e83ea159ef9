//! Capture state and the strategy state machine.
//!
//! A capture session walks forward through
//! `Idle → NativeRegistered → SimplifiedRegistered → PollingFallback → Stopped`.
//! Steps may be skipped, never taken backwards: once a strategy has been given up
//! on, it is not retried until the next session (the next `start()`).

use crate::error::CaptureError;
use std::fmt;
use thiserror::Error;

/// Ways of obtaining pointer data, best first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Strategy {
    /// Raw-input registration that receives input in the background.
    NativeRawInput,
    /// Raw-input registration with default flags.
    SimplifiedRawInput,
    /// Timed cursor sampling; works wherever the cursor can be read.
    Polling,
}

impl Strategy {
    /// Fallback order.
    pub const ORDER: [Strategy; 3] = [
        Strategy::NativeRawInput,
        Strategy::SimplifiedRawInput,
        Strategy::Polling,
    ];

    /// Whether this strategy delivers OS-pushed packets.
    #[inline]
    pub fn is_push(self) -> bool {
        !matches!(self, Strategy::Polling)
    }

    /// Next strategy down the fallback chain.
    pub fn next(self) -> Option<Strategy> {
        match self {
            Strategy::NativeRawInput => Some(Strategy::SimplifiedRawInput),
            Strategy::SimplifiedRawInput => Some(Strategy::Polling),
            Strategy::Polling => None,
        }
    }

    /// Phase entered when this strategy becomes active.
    pub fn phase(self) -> CapturePhase {
        match self {
            Strategy::NativeRawInput => CapturePhase::NativeRegistered,
            Strategy::SimplifiedRawInput => CapturePhase::SimplifiedRegistered,
            Strategy::Polling => CapturePhase::PollingFallback,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::NativeRawInput => "native raw input",
            Strategy::SimplifiedRawInput => "simplified raw input",
            Strategy::Polling => "polling",
        };
        f.write_str(s)
    }
}

/// Where a session currently is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CapturePhase {
    Idle,
    NativeRegistered,
    SimplifiedRegistered,
    PollingFallback,
    Stopped,
}

impl CapturePhase {
    fn rank(self) -> u8 {
        match self {
            CapturePhase::Idle => 0,
            CapturePhase::NativeRegistered => 1,
            CapturePhase::SimplifiedRegistered => 2,
            CapturePhase::PollingFallback => 3,
            CapturePhase::Stopped => 4,
        }
    }

    /// Strategy active in this phase, if any.
    pub fn strategy(self) -> Option<Strategy> {
        match self {
            CapturePhase::NativeRegistered => Some(Strategy::NativeRawInput),
            CapturePhase::SimplifiedRegistered => Some(Strategy::SimplifiedRawInput),
            CapturePhase::PollingFallback => Some(Strategy::Polling),
            CapturePhase::Idle | CapturePhase::Stopped => None,
        }
    }
}

/// A transition that would move the session backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal capture transition {from:?} -> {to:?}")]
pub struct TransitionError {
    pub from: CapturePhase,
    pub to: CapturePhase,
}

/// Snapshot of an adapter's capture state.
///
/// The adapter owns the live instance; consumers get clones through
/// [`CaptureAdapter::state`](crate::capture::CaptureAdapter::state).
#[derive(Clone, Debug)]
pub struct CaptureState {
    phase: CapturePhase,
    running: bool,
    degraded: bool,
    session: u64,
    attempted: Vec<Strategy>,
    last_error: Option<CaptureError>,
}

impl Default for CaptureState {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureState {
    pub fn new() -> Self {
        Self {
            phase: CapturePhase::Idle,
            running: false,
            degraded: false,
            session: 0,
            attempted: Vec::new(),
            last_error: None,
        }
    }

    #[inline]
    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// Whether a capture worker is live.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// `true` once the pointer could not be read; the session delivers nothing more.
    #[inline]
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Sessions started so far (1-based once started).
    #[inline]
    pub fn session(&self) -> u64 {
        self.session
    }

    /// Strategy currently delivering events.
    pub fn active_strategy(&self) -> Option<Strategy> {
        self.phase.strategy()
    }

    /// Strategies attempted this session, in attempt order.
    pub fn attempted(&self) -> &[Strategy] {
        &self.attempted
    }

    /// Most recent error recorded this session.
    pub fn last_error(&self) -> Option<&CaptureError> {
        self.last_error.as_ref()
    }

    /// Reset for a new session and mark the worker live.
    pub(crate) fn begin_session(&mut self) {
        self.phase = CapturePhase::Idle;
        self.running = true;
        self.degraded = false;
        self.session += 1;
        self.attempted.clear();
        self.last_error = None;
    }

    /// Note that `strategy` is about to be tried. Attempts must go down the chain.
    pub(crate) fn record_attempt(&mut self, strategy: Strategy) -> Result<(), TransitionError> {
        if let Some(&last) = self.attempted.last() {
            if strategy <= last {
                return Err(TransitionError {
                    from: last.phase(),
                    to: strategy.phase(),
                });
            }
        }
        if let Some(active) = self.phase.strategy() {
            if strategy <= active {
                return Err(TransitionError {
                    from: self.phase,
                    to: strategy.phase(),
                });
            }
        }
        self.attempted.push(strategy);
        Ok(())
    }

    /// Move forward to `to`.
    pub(crate) fn enter(&mut self, to: CapturePhase) -> Result<(), TransitionError> {
        if to.rank() <= self.phase.rank() {
            return Err(TransitionError {
                from: self.phase,
                to,
            });
        }
        self.phase = to;
        Ok(())
    }

    pub(crate) fn record_error(&mut self, err: CaptureError) {
        self.last_error = Some(err);
    }

    /// Mark the session degraded. Returns `true` only the first time, so the
    /// caller reports the loss once.
    pub(crate) fn mark_degraded(&mut self, err: CaptureError) -> bool {
        self.last_error = Some(err);
        !std::mem::replace(&mut self.degraded, true)
    }

    /// End the session. Safe to call repeatedly.
    pub(crate) fn finish(&mut self) {
        if self.session > 0 {
            self.phase = CapturePhase::Stopped;
        }
        self.running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_chain_is_ordered() {
        assert_eq!(Strategy::NativeRawInput.next(), Some(Strategy::SimplifiedRawInput));
        assert_eq!(Strategy::SimplifiedRawInput.next(), Some(Strategy::Polling));
        assert_eq!(Strategy::Polling.next(), None);
        assert!(Strategy::ORDER.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn phases_only_move_forward() {
        let mut state = CaptureState::new();
        state.begin_session();
        state.enter(CapturePhase::SimplifiedRegistered).unwrap();

        let err = state.enter(CapturePhase::NativeRegistered).unwrap_err();
        assert_eq!(err.from, CapturePhase::SimplifiedRegistered);
        assert!(state.enter(CapturePhase::SimplifiedRegistered).is_err());

        state.enter(CapturePhase::PollingFallback).unwrap();
        assert_eq!(state.active_strategy(), Some(Strategy::Polling));
    }

    #[test]
    fn attempts_never_go_back_up() {
        let mut state = CaptureState::new();
        state.begin_session();
        state.record_attempt(Strategy::NativeRawInput).unwrap();
        state.record_attempt(Strategy::SimplifiedRawInput).unwrap();
        assert!(state.record_attempt(Strategy::NativeRawInput).is_err());
        assert!(state.record_attempt(Strategy::SimplifiedRawInput).is_err());
        state.record_attempt(Strategy::Polling).unwrap();
        assert_eq!(
            state.attempted(),
            &[
                Strategy::NativeRawInput,
                Strategy::SimplifiedRawInput,
                Strategy::Polling
            ]
        );
    }

    #[test]
    fn new_session_resets_chain() {
        let mut state = CaptureState::new();
        state.begin_session();
        state.record_attempt(Strategy::Polling).unwrap();
        state.enter(CapturePhase::PollingFallback).unwrap();
        state.finish();
        assert_eq!(state.phase(), CapturePhase::Stopped);

        state.begin_session();
        assert_eq!(state.session(), 2);
        assert_eq!(state.phase(), CapturePhase::Idle);
        assert!(state.attempted().is_empty());
        state.record_attempt(Strategy::NativeRawInput).unwrap();
    }

    #[test]
    fn degraded_reports_once() {
        let mut state = CaptureState::new();
        state.begin_session();
        let err = CaptureError::DeviceUnavailable("gone".into());
        assert!(state.mark_degraded(err.clone()));
        assert!(!state.mark_degraded(err));
        assert!(state.is_degraded());
    }

    #[test]
    fn finish_is_idempotent() {
        let mut state = CaptureState::new();
        state.finish();
        assert_eq!(state.phase(), CapturePhase::Idle);
        assert!(!state.is_running());

        state.begin_session();
        state.finish();
        state.finish();
        assert_eq!(state.phase(), CapturePhase::Stopped);
        assert!(!state.is_running());
    }
}
