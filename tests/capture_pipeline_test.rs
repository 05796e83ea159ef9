use rawtrail::backends::virtual_input::VirtualPointer;
use rawtrail::backends::Unsupported;
use rawtrail::decode::RawMouseSample;
use rawtrail::{
    CaptureAdapter, CaptureConfig, CaptureError, CapturePhase, CursorSampler, MouseButton, PointerBackend, PointerEvent,
    PushSource, Strategy,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn quick_config() -> CaptureConfig {
    CaptureConfig {
        poll_interval_ms: 1,
        pump_timeout_ms: 2,
        join_timeout_ms: 1000,
        ..CaptureConfig::default()
    }
}

fn adapter(pointer: &VirtualPointer, config: CaptureConfig) -> CaptureAdapter {
    CaptureAdapter::new(Arc::new(pointer.clone()), config)
}

fn wait_for(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    cond()
}

/// Drain until `n` events have been collected (or the wait gives up).
fn collect(capture: &CaptureAdapter, n: usize) -> Vec<PointerEvent> {
    let mut got = Vec::new();
    wait_for(|| {
        got.extend(capture.drain());
        got.len() >= n
    });
    got
}

fn deltas(events: &[PointerEvent]) -> Vec<(i32, i32)> {
    events.iter().filter_map(|e| e.delta()).collect()
}

/// Backend whose push source can be told to hang inside one `pump` call, or to
/// panic there.
#[derive(Default)]
struct Stalling {
    stall_next_pump: AtomicBool,
    panic_in_pump: AtomicBool,
    stalled: AtomicBool,
    unregistered: AtomicUsize,
    abandoned: AtomicUsize,
}

const STALL: Duration = Duration::from_millis(300);

struct StallingBackend(Arc<Stalling>);

impl PointerBackend for StallingBackend {
    fn name(&self) -> &str {
        "stalling"
    }

    fn register(&self, _strategy: Strategy) -> Result<Box<dyn PushSource>, CaptureError> {
        Ok(Box::new(StallingSource(Arc::clone(&self.0))))
    }

    fn sampler(&self) -> Result<Box<dyn CursorSampler>, CaptureError> {
        Err(CaptureError::DeviceUnavailable("no cursor".into()))
    }
}

struct StallingSource(Arc<Stalling>);

impl PushSource for StallingSource {
    fn pump(&mut self, timeout: Duration, _sink: &mut dyn FnMut(PointerEvent)) -> Result<(), CaptureError> {
        if self.0.panic_in_pump.load(Ordering::SeqCst) {
            panic!("pump blew up");
        }
        if self.0.stall_next_pump.swap(false, Ordering::SeqCst) {
            self.0.stalled.store(true, Ordering::SeqCst);
            std::thread::sleep(STALL);
        } else {
            std::thread::sleep(timeout);
        }
        Ok(())
    }

    fn unregister(&mut self) {
        self.0.unregistered.fetch_add(1, Ordering::SeqCst);
    }

    fn abandon(&mut self) {
        self.0.abandoned.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn injected_deltas_arrive_in_order() {
    let pointer = VirtualPointer::new();
    let mut capture = adapter(&pointer, quick_config());
    capture.start();

    pointer.inject_move(3, 0);
    pointer.inject_move(-1, 2);
    pointer.inject_move(0, -5);

    let got = collect(&capture, 3);
    assert_eq!(deltas(&got), vec![(3, 0), (-1, 2), (0, -5)]);
    capture.stop();
}

#[test]
fn delivered_delta_sum_matches_injected() {
    let pointer = VirtualPointer::new();
    let mut capture = adapter(&pointer, quick_config());
    capture.start();

    let mut expected = (0, 0);
    for i in 0..200 {
        let (dx, dy) = ((i % 7) - 3, 2 - (i % 5));
        if dx == 0 && dy == 0 {
            continue;
        }
        expected.0 += dx;
        expected.1 += dy;
        pointer.inject_move(dx, dy);
    }

    let mut sum = (0, 0);
    wait_for(|| {
        for (dx, dy) in deltas(&capture.drain()) {
            sum.0 += dx;
            sum.1 += dy;
        }
        sum == expected
    });
    assert_eq!(sum, expected);
    assert_eq!(capture.queue_stats().dropped(), 0);
}

#[test]
fn native_failure_falls_back_to_simplified_before_polling() {
    let pointer = VirtualPointer::new();
    pointer.fail_registration(Strategy::NativeRawInput);
    let mut capture = adapter(&pointer, quick_config());

    let state = capture.start();
    assert_eq!(state.active_strategy(), Some(Strategy::SimplifiedRawInput));
    assert_eq!(state.attempted(), &[Strategy::NativeRawInput, Strategy::SimplifiedRawInput]);
    assert!(matches!(
        state.last_error(),
        Some(CaptureError::RegistrationFailure { strategy: Strategy::NativeRawInput, .. })
    ));
    assert_eq!(
        pointer.registration_attempts(),
        vec![Strategy::NativeRawInput, Strategy::SimplifiedRawInput]
    );

    pointer.inject_move(4, 4);
    assert_eq!(deltas(&collect(&capture, 1)), vec![(4, 4)]);
}

#[test]
fn both_push_strategies_failing_ends_in_polling() {
    let pointer = VirtualPointer::new();
    pointer.fail_registration(Strategy::NativeRawInput);
    pointer.fail_registration(Strategy::SimplifiedRawInput);
    let mut capture = adapter(&pointer, quick_config());

    let state = capture.start();
    assert_eq!(state.phase(), CapturePhase::PollingFallback);
    assert_eq!(state.attempted(), &Strategy::ORDER);
    assert!(!state.is_degraded());
}

#[test]
fn polling_reports_motion_and_button_edges() {
    let pointer = VirtualPointer::new();
    pointer.fail_registration(Strategy::NativeRawInput);
    pointer.fail_registration(Strategy::SimplifiedRawInput);
    pointer.move_cursor_to(100, 100);
    let mut capture = adapter(&pointer, quick_config());
    capture.start();

    // The first sample is only the baseline.
    assert!(wait_for(|| pointer.samples_taken() >= 2));
    assert!(capture.drain().is_empty());

    pointer.move_cursor_by(5, -2);
    assert_eq!(deltas(&collect(&capture, 1)), vec![(5, -2)]);

    pointer.press_button(MouseButton::Left);
    let got = collect(&capture, 1);
    assert!(matches!(got.as_slice(), [PointerEvent::Button(b)] if b.button == MouseButton::Left && b.pressed));

    pointer.release_button(MouseButton::Left);
    let got = collect(&capture, 1);
    assert!(matches!(got.as_slice(), [PointerEvent::Button(b)] if !b.pressed));
}

#[test]
fn device_loss_is_reported_once_and_sampling_stops() {
    let pointer = VirtualPointer::new();
    pointer.fail_registration(Strategy::NativeRawInput);
    pointer.fail_registration(Strategy::SimplifiedRawInput);
    let mut capture = adapter(&pointer, quick_config());
    capture.start();
    assert!(wait_for(|| pointer.samples_taken() >= 1));

    pointer.lose_device();
    assert!(wait_for(|| capture.state().is_degraded()));
    let state = capture.state();
    assert!(matches!(state.last_error(), Some(CaptureError::DeviceUnavailable(_))));
    assert!(state.is_running());

    let taken = pointer.samples_taken();
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(pointer.samples_taken(), taken);

    capture.stop();
    assert!(!capture.is_running());
}

#[test]
fn mid_session_loss_moves_down_never_up() {
    let pointer = VirtualPointer::new();
    let mut capture = adapter(&pointer, quick_config());
    assert_eq!(capture.start().active_strategy(), Some(Strategy::NativeRawInput));

    pointer.disconnect();
    assert!(wait_for(|| capture.state().active_strategy() == Some(Strategy::SimplifiedRawInput)));
    assert!(matches!(capture.state().last_error(), Some(CaptureError::SourceLost(_))));
    assert_eq!(pointer.unregister_count(), 1);

    pointer.inject_move(1, 1);
    assert_eq!(deltas(&collect(&capture, 1)), vec![(1, 1)]);

    pointer.disconnect();
    assert!(wait_for(|| capture.state().phase() == CapturePhase::PollingFallback));
    assert_eq!(
        pointer.registration_attempts(),
        vec![Strategy::NativeRawInput, Strategy::SimplifiedRawInput]
    );
    assert_eq!(capture.state().attempted(), &Strategy::ORDER);
}

#[test]
fn overflow_keeps_the_newest_event() {
    let pointer = VirtualPointer::new();
    let config = CaptureConfig {
        queue_capacity: 4,
        ..quick_config()
    };
    let mut capture = adapter(&pointer, config);
    capture.start();

    for dx in 1..=100 {
        pointer.inject_move(dx, 0);
    }
    assert!(wait_for(|| capture.queue_stats().pushed() == 100));

    let got = capture.drain();
    assert_eq!(deltas(&got), vec![(97, 0), (98, 0), (99, 0), (100, 0)]);
    assert_eq!(capture.queue_stats().dropped(), 96);
}

#[test]
fn unbounded_queue_is_lossless() {
    let pointer = VirtualPointer::new();
    let config = CaptureConfig {
        queue_capacity: 0,
        ..quick_config()
    };
    let mut capture = adapter(&pointer, config);
    capture.start();

    for _ in 0..5000 {
        pointer.inject_move(1, 0);
    }
    assert!(wait_for(|| capture.queue_stats().pushed() == 5000));
    assert_eq!(capture.drain().len(), 5000);
    assert_eq!(capture.queue_stats().dropped(), 0);
}

#[test]
fn absolute_devices_report_deltas() {
    let pointer = VirtualPointer::new();
    let mut capture = adapter(&pointer, quick_config());
    capture.start();

    pointer.feed(RawMouseSample::absolute(30000, 30000));
    pointer.feed(RawMouseSample::absolute(30500, 29000));
    pointer.inject_wheel(-120);

    let got = collect(&capture, 2);
    assert_eq!(deltas(&got), vec![(500, -1000)]);
    assert_eq!(got.last().map(|e| e.to_string()).as_deref(), Some("wheel Δ-120"));
}

#[test]
fn stop_twice_is_harmless() {
    let pointer = VirtualPointer::new();
    let mut capture = adapter(&pointer, quick_config());
    capture.start();

    capture.stop();
    assert!(!capture.state().is_running());
    capture.stop();
    let state = capture.state();
    assert!(!state.is_running());
    assert_eq!(state.phase(), CapturePhase::Stopped);
    assert_eq!(pointer.unregister_count(), 1);
}

#[test]
fn start_stop_cycles_finish_within_join_timeout() {
    let pointer = VirtualPointer::new();
    let mut capture = adapter(&pointer, quick_config());
    let join_timeout = capture.config().join_timeout();

    for round in 1..=20u64 {
        let state = capture.start();
        assert_eq!(state.session(), round);
        assert_eq!(state.active_strategy(), Some(Strategy::NativeRawInput));

        let t0 = Instant::now();
        capture.stop();
        assert!(t0.elapsed() < join_timeout);

        let state = capture.state();
        assert!(!state.is_running());
        assert!(!matches!(state.last_error(), Some(CaptureError::ThreadJoinTimeout(_))));
    }
    assert_eq!(pointer.unregister_count(), 20);
}

#[test]
fn restart_begins_a_fresh_session() {
    let pointer = VirtualPointer::new();
    let mut capture = adapter(&pointer, quick_config());
    capture.start();
    pointer.disconnect();
    assert!(wait_for(|| capture.state().active_strategy() == Some(Strategy::SimplifiedRawInput)));
    capture.stop();

    let state = capture.start();
    assert_eq!(state.active_strategy(), Some(Strategy::NativeRawInput));
    assert_eq!(state.attempted(), &[Strategy::NativeRawInput]);
    assert_eq!(state.last_error(), None);
}

#[test]
fn unsupported_platform_degrades_without_failing() {
    let mut capture = CaptureAdapter::new(Arc::new(Unsupported), quick_config());
    let state = capture.start();
    assert_eq!(state.attempted(), &Strategy::ORDER);
    assert!(wait_for(|| capture.state().is_degraded()));
    assert_eq!(capture.state().phase(), CapturePhase::PollingFallback);
    assert!(capture.try_next().is_none());

    capture.stop();
    assert_eq!(capture.state().phase(), CapturePhase::Stopped);
}

#[test]
fn dropping_the_adapter_stops_the_worker() {
    let pointer = VirtualPointer::new();
    {
        let mut capture = adapter(&pointer, quick_config());
        capture.start();
    }
    assert_eq!(pointer.unregister_count(), 1);
    assert_eq!(pointer.active_registration(), None);
}

#[test]
fn extreme_absolute_jumps_do_not_kill_the_worker() {
    let pointer = VirtualPointer::new();
    let mut capture = adapter(&pointer, quick_config());
    capture.start();

    pointer.feed(RawMouseSample::absolute(i32::MIN, i32::MIN));
    pointer.feed(RawMouseSample::absolute(i32::MAX, i32::MAX));
    pointer.inject_move(1, 1);

    let got = collect(&capture, 2);
    assert_eq!(deltas(&got), vec![(i32::MAX, i32::MAX), (1, 1)]);
    let state = capture.state();
    assert!(state.is_running());
    assert!(!state.is_degraded());
}

#[test]
fn worker_panic_leaves_the_session_degraded() {
    let faulty = Arc::new(Stalling::default());
    faulty.panic_in_pump.store(true, Ordering::SeqCst);
    let mut capture = CaptureAdapter::new(Arc::new(StallingBackend(Arc::clone(&faulty))), quick_config());

    capture.start();
    assert!(wait_for(|| capture.state().is_degraded()));
    assert!(matches!(capture.state().last_error(), Some(CaptureError::DeviceUnavailable(_))));

    capture.stop();
    let state = capture.state();
    assert_eq!(state.phase(), CapturePhase::Stopped);
    assert!(!matches!(state.last_error(), Some(CaptureError::ThreadJoinTimeout(_))));
}

#[test]
fn stuck_worker_is_detached_and_cannot_touch_the_next_session() {
    let stall = Arc::new(Stalling::default());
    let config = CaptureConfig {
        join_timeout_ms: 20,
        ..quick_config()
    };
    let mut capture = CaptureAdapter::new(Arc::new(StallingBackend(Arc::clone(&stall))), config);

    assert_eq!(capture.start().phase(), CapturePhase::NativeRegistered);
    stall.stall_next_pump.store(true, Ordering::SeqCst);
    assert!(wait_for(|| stall.stalled.load(Ordering::SeqCst)));

    let t0 = Instant::now();
    capture.stop();
    assert!(t0.elapsed() < STALL);
    let state = capture.state();
    assert_eq!(state.phase(), CapturePhase::Stopped);
    assert!(matches!(state.last_error(), Some(CaptureError::ThreadJoinTimeout(_))));

    let state = capture.start();
    assert_eq!(state.session(), 2);
    assert_eq!(state.phase(), CapturePhase::NativeRegistered);

    // The detached worker wakes up, sees a newer session and leaves it alone.
    assert!(wait_for(|| stall.abandoned.load(Ordering::SeqCst) == 1));
    assert_eq!(stall.unregistered.load(Ordering::SeqCst), 0);
    let state = capture.state();
    assert_eq!(state.session(), 2);
    assert_eq!(state.phase(), CapturePhase::NativeRegistered);
    assert!(state.is_running());
    assert_eq!(state.last_error(), None);

    capture.stop();
    assert!(wait_for(|| stall.unregistered.load(Ordering::SeqCst) == 1));
    assert_eq!(stall.abandoned.load(Ordering::SeqCst), 1);
}
