//! Live pointer capture printed once per frame.
//!
//! ```text
//! cargo run --example trail -- [config.toml] [seconds] [trace.json]
//! ```

use rawtrail::logger::{self, EventLogger};
use rawtrail::trace::PointerTrace;
use rawtrail::{CaptureAdapter, CaptureConfig};
use std::time::{Duration, Instant};

const FRAME: Duration = Duration::from_millis(16);

fn main() {
    logger::init_tracing("rawtrail=info");

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) if path != "-" => CaptureConfig::load(&path).expect("load config"),
        _ => CaptureConfig::default(),
    };
    let seconds: u64 = args.next().and_then(|s| s.parse().ok()).unwrap_or(10);
    let save_to = args.next();

    let mut trace = PointerTrace::new(config.trace_capacity);
    let mut log = EventLogger::new();
    let mut capture = CaptureAdapter::for_platform(config);

    let state = capture.start();
    println!(
        "capturing for {seconds}s via {:?} (degraded={})",
        state.active_strategy(),
        state.is_degraded()
    );

    let end = Instant::now() + Duration::from_secs(seconds);
    while Instant::now() < end {
        let frame_start = Instant::now();

        let events = capture.drain();
        if !events.is_empty() {
            log.log_all(&events);
            trace.extend(&events);
            println!("{:>4} events  pos={:?}", events.len(), trace.position());
        }

        let elapsed = frame_start.elapsed();
        if elapsed < FRAME {
            std::thread::sleep(FRAME - elapsed);
        }
    }

    capture.stop();
    let stats = capture.queue_stats();
    println!(
        "moves={} buttons={} wheels={} dropped={} peak={}",
        log.moves,
        log.buttons,
        log.wheels,
        stats.dropped(),
        stats.peak_occupancy()
    );

    if let Some(path) = save_to {
        trace.save_json(&path).expect("save trace");
        println!("saved {} points to {path}", trace.len());
    }
}
