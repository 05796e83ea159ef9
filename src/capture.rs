//! Input capture adapter.
//!
//! [`CaptureAdapter`] owns the capture lifecycle:
//! - `start()` spawns one worker thread which walks the fallback chain
//!   (native raw input → simplified raw input → polling) and settles on the first
//!   strategy that works,
//! - the worker decodes pointer packets and pushes them onto the delivery queue
//!   without ever blocking on it,
//! - `stop()` signals the worker, which unregisters from the OS, and joins it with
//!   a bounded wait.
//!
//! Capture never fails outright. Registration errors trigger fallback, a lost
//! pointer leaves the session degraded, a stuck worker is detached. The consumer
//! only ever sees data or nothing.
//!
//! # Example
//! ```no_run
//! use rawtrail::{CaptureAdapter, CaptureConfig};
//!
//! let mut capture = CaptureAdapter::for_platform(CaptureConfig::default());
//! let state = capture.start();
//! println!("capturing via {:?}", state.active_strategy());
//!
//! // once per frame:
//! for event in capture.drain() {
//!     println!("{event}");
//! }
//!
//! capture.stop();
//! ```

use crate::backends;
use crate::config::CaptureConfig;
use crate::decode::button_edges;
use crate::device::{CursorSample, PointerBackend, PushSource};
use crate::error::CaptureError;
use crate::event::PointerEvent;
use crate::queue::{event_queue, EventReceiver, EventSender, QueueStats};
use crate::state::{CaptureState, Strategy};
use crossbeam_channel::Sender;
use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Granularity of the bounded join in `stop()`.
const JOIN_POLL: Duration = Duration::from_millis(1);

/// Pointer capture with strategy fallback and a non-blocking delivery queue.
pub struct CaptureAdapter {
    backend: Arc<dyn PointerBackend>,
    config: CaptureConfig,
    state: Arc<Mutex<CaptureState>>,
    sender: EventSender,
    receiver: EventReceiver,
    worker: Option<Worker>,
}

struct Worker {
    handle: JoinHandle<()>,
    stop: Arc<AtomicBool>,
}

impl CaptureAdapter {
    pub fn new(backend: Arc<dyn PointerBackend>, config: CaptureConfig) -> Self {
        if let Err(e) = config.validate() {
            tracing::warn!("{e}; out-of-range timings are clamped to 1 ms");
        }
        let (sender, receiver) = event_queue(config.queue_bound());
        Self {
            backend,
            config,
            state: Arc::new(Mutex::new(CaptureState::new())),
            sender,
            receiver,
            worker: None,
        }
    }

    /// Adapter over the backend for the current platform.
    pub fn for_platform(config: CaptureConfig) -> Self {
        Self::new(backends::platform_backend(), config)
    }

    /// Start capturing and return the state once the worker has settled on a
    /// strategy (or `startup_timeout` elapsed). A no-op while already running.
    pub fn start(&mut self) -> CaptureState {
        if self.worker.is_some() {
            return self.state();
        }

        let session = {
            let mut state = self.state.lock();
            state.begin_session();
            state.session()
        };

        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let ctx = WorkerCtx {
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            state: Arc::clone(&self.state),
            session,
            sender: self.sender.clone(),
            stop: Arc::clone(&stop),
            ready: Some(ready_tx),
        };

        let shared = Arc::clone(&self.state);
        let spawned = std::thread::Builder::new()
            .name("rawtrail-capture".into())
            .spawn(move || {
                if panic::catch_unwind(AssertUnwindSafe(|| ctx.run())).is_err() {
                    degrade_after_panic(&shared, session);
                }
            });

        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker { handle, stop });
                match ready_rx.recv_timeout(self.config.startup_timeout()) {
                    Ok(strategy) => tracing::info!(
                        "Pointer capture started (backend={}, strategy={})",
                        self.backend.name(),
                        strategy
                    ),
                    Err(_) => tracing::warn!(
                        "Capture worker did not settle on a strategy within {:?}",
                        self.config.startup_timeout()
                    ),
                }
            }
            Err(e) => {
                let err = CaptureError::DeviceUnavailable(format!("failed to spawn capture worker: {e}"));
                tracing::error!("{err}");
                let mut state = self.state.lock();
                state.mark_degraded(err);
                state.finish();
            }
        }

        self.state()
    }

    /// Stop capturing. Idempotent.
    ///
    /// Waits at most `join_timeout` for the worker; a worker that does not exit in
    /// time is detached and reported as `ThreadJoinTimeout`.
    pub fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            self.state.lock().finish();
            return;
        };

        worker.stop.store(true, Ordering::SeqCst);

        let timeout = self.config.join_timeout();
        if !join_with_timeout(worker.handle, timeout) {
            let err = CaptureError::ThreadJoinTimeout(timeout);
            tracing::warn!("{err}; detaching it");
            self.state.lock().record_error(err);
        }

        self.state.lock().finish();
        tracing::info!(
            "Pointer capture stopped (pushed={}, dropped={}, consumed={})",
            self.sender.stats().pushed(),
            self.sender.stats().dropped(),
            self.sender.stats().consumed()
        );
    }

    /// Snapshot of the capture state.
    pub fn state(&self) -> CaptureState {
        self.state.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().is_running()
    }

    /// Consumer handle to the delivery queue.
    pub fn receiver(&self) -> &EventReceiver {
        &self.receiver
    }

    /// Next queued event, or `None` immediately.
    pub fn try_next(&self) -> Option<PointerEvent> {
        self.receiver.try_next()
    }

    /// Everything queued right now, oldest first.
    pub fn drain(&self) -> Vec<PointerEvent> {
        self.receiver.drain()
    }

    pub fn queue_stats(&self) -> Arc<QueueStats> {
        self.receiver.stats()
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }
}

impl Drop for CaptureAdapter {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Join `handle` if it finishes within `timeout`. Returns `false` on timeout
/// (the thread is then detached by dropping the handle).
fn join_with_timeout(handle: JoinHandle<()>, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(JOIN_POLL);
    }
    if handle.join().is_err() {
        tracing::error!("Capture worker panicked");
    }
    true
}

/// A panicking worker leaves its session degraded rather than silently dead.
fn degrade_after_panic(state: &Mutex<CaptureState>, session: u64) {
    let mut state = state.lock();
    if state.session() != session {
        return;
    }
    let err = CaptureError::DeviceUnavailable("capture worker panicked".into());
    if state.mark_degraded(err.clone()) {
        tracing::error!("{err}; capture degraded until stop()");
    }
}

enum PushExit {
    Stopped,
    Failed,
}

/// Everything the worker thread owns.
struct WorkerCtx {
    backend: Arc<dyn PointerBackend>,
    config: CaptureConfig,
    state: Arc<Mutex<CaptureState>>,
    /// Session this worker belongs to. A detached worker from an older session
    /// must not touch the state of a newer one.
    session: u64,
    sender: EventSender,
    stop: Arc<AtomicBool>,
    ready: Option<Sender<Strategy>>,
}

impl WorkerCtx {
    fn run(mut self) {
        let mut next = Some(Strategy::NativeRawInput);

        while let Some(strategy) = next {
            if self.stopping() {
                break;
            }
            if !self.config.allows(strategy) {
                tracing::debug!("Skipping {strategy} (disabled by config)");
                next = strategy.next();
                continue;
            }
            match self.update(|s| s.record_attempt(strategy)) {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    tracing::error!("{e}");
                    break;
                }
                None => return,
            }

            next = match strategy {
                Strategy::Polling => {
                    self.run_polling();
                    None
                }
                push => match self.backend.register(push) {
                    Ok(source) => match self.run_push(push, source) {
                        PushExit::Stopped => None,
                        PushExit::Failed => push.next(),
                    },
                    Err(err) => {
                        tracing::warn!("{err}; falling back");
                        self.update(|s| s.record_error(err));
                        push.next()
                    }
                },
            };
        }

        tracing::debug!("Capture worker exiting");
    }

    #[inline]
    fn stopping(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Mutate the shared state if it still belongs to this worker's session.
    fn update<R>(&self, f: impl FnOnce(&mut CaptureState) -> R) -> Option<R> {
        let mut state = self.state.lock();
        (state.session() == self.session).then(|| f(&mut state))
    }

    fn activate(&mut self, strategy: Strategy) {
        if let Some(Err(e)) = self.update(|s| s.enter(strategy.phase())) {
            tracing::error!("{e}");
        }
        tracing::info!("Capture active via {strategy}");
        if let Some(ready) = self.ready.take() {
            let _ = ready.send(strategy);
        }
    }

    fn run_push(&mut self, strategy: Strategy, mut source: Box<dyn PushSource>) -> PushExit {
        self.activate(strategy);

        let timeout = self.config.pump_timeout();
        let report_every = self.config.activity_report_interval();
        let mut total: u64 = 0;
        let mut last_activity = Instant::now();

        let exit = loop {
            if self.stopping() {
                break PushExit::Stopped;
            }

            let sender = &self.sender;
            let mut delivered: u64 = 0;
            let pumped = source.pump(timeout, &mut |ev| {
                sender.push(ev);
                delivered += 1;
            });

            if let Err(err) = pumped {
                tracing::warn!("{strategy} stopped delivering: {err}; falling back");
                self.update(|s| s.record_error(err));
                break PushExit::Failed;
            }

            if delivered > 0 {
                total += delivered;
                last_activity = Instant::now();
            } else if let Some(every) = report_every {
                if last_activity.elapsed() >= every {
                    tracing::debug!("Activity report: {total} pointer events via {strategy}");
                    if total == 0 {
                        tracing::debug!("No raw input received yet; registration may be ineffective");
                    }
                    last_activity = Instant::now();
                }
            }
        };

        // A detached worker must not undo a newer session's registration.
        if self.update(|_| ()).is_some() {
            source.unregister();
        } else {
            source.abandon();
        }
        exit
    }

    fn run_polling(&mut self) {
        self.activate(Strategy::Polling);

        let mut sampler = match self.backend.sampler() {
            Ok(s) => s,
            Err(err) => {
                self.report_unavailable(err);
                self.idle_until_stopped();
                return;
            }
        };

        let interval = self.config.poll_interval();
        let mut last: Option<CursorSample> = None;
        let mut batch = Vec::new();

        while !self.stopping() {
            let tick = Instant::now();

            match sampler.sample() {
                Ok(sample) => {
                    if let Some(prev) = last {
                        let dx = sample.x.saturating_sub(prev.x);
                        let dy = sample.y.saturating_sub(prev.y);
                        if dx != 0 || dy != 0 {
                            batch.push(PointerEvent::movement(dx, dy, tick));
                        }
                        button_edges(prev.buttons, sample.buttons, tick, &mut batch);
                    }
                    last = Some(sample);
                    for ev in batch.drain(..) {
                        self.sender.push(ev);
                    }
                }
                Err(err) => {
                    self.report_unavailable(err);
                    self.idle_until_stopped();
                    return;
                }
            }

            let elapsed = tick.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
    }

    fn report_unavailable(&self, err: CaptureError) {
        let first = self.update(|s| s.mark_degraded(err.clone())).unwrap_or(false);
        if first {
            tracing::error!("{err}; capture degraded, no further sampling this session");
        }
    }

    /// Degraded sessions wait here for `stop()` instead of retrying.
    fn idle_until_stopped(&self) {
        let nap = self.config.pump_timeout();
        while !self.stopping() {
            std::thread::sleep(nap);
        }
    }
}
