use rawtrail::backends::virtual_input::VirtualPointer;
use rawtrail::logger::{self, EventLogger};
use rawtrail::trace::PointerTrace;
use rawtrail::{CaptureAdapter, CaptureConfig, MouseButton, Strategy};
use std::sync::Arc;
use std::time::Duration;

fn main() {
    logger::init_tracing("rawtrail=debug");

    // A virtual pointer whose native registration is refused.
    let pointer = VirtualPointer::new();
    pointer.fail_registration(Strategy::NativeRawInput);

    let config = CaptureConfig::default();
    let mut trace = PointerTrace::new(config.trace_capacity).starting_at(640, 360);
    let mut capture = CaptureAdapter::new(Arc::new(pointer.clone()), config);

    let state = capture.start();
    println!("(Virtual) capturing via {:?}", state.active_strategy());

    // Inject a small gesture.
    for (dx, dy) in [(3, 0), (-1, 2), (0, -5), (12, 7)] {
        pointer.inject_move(dx, dy);
    }
    pointer.inject_button(MouseButton::Left, true);
    pointer.inject_wheel(-120);
    pointer.inject_button(MouseButton::Left, false);

    std::thread::sleep(Duration::from_millis(50));

    let mut log = EventLogger::new();
    let events = capture.drain();
    log.log_all(&events);
    trace.extend(&events);

    // Losing the registration mid-session moves capture down to polling.
    pointer.disconnect();
    std::thread::sleep(Duration::from_millis(50));
    pointer.move_cursor_by(8, -3);
    std::thread::sleep(Duration::from_millis(50));
    let events = capture.drain();
    log.log_all(&events);
    trace.extend(&events);

    capture.stop();

    let state = capture.state();
    println!("(Virtual) attempted {:?}, ended in {:?}", state.attempted(), state.phase());
    println!("(Virtual) {} events, cursor at {:?}", log.total(), trace.position());
    trace.write_text(std::io::stdout()).expect("write trace");
}
