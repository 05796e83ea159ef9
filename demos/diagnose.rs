//! Print what this machine offers for pointer capture.
//!
//! - which strategy the platform backend settles on,
//! - on Windows with the `hid` feature, every HID mouse and a few live boot reports.

use rawtrail::{logger, CaptureAdapter, CaptureConfig};
use std::time::Duration;

fn main() {
    logger::init_tracing("rawtrail=debug");

    let mut capture = CaptureAdapter::for_platform(CaptureConfig::default());
    let state = capture.start();
    std::thread::sleep(Duration::from_millis(200));
    let state_after = capture.state();
    capture.stop();

    println!("backend:   {}", capture.backend_name());
    println!("attempted: {:?}", state.attempted());
    println!("active:    {:?}", state.active_strategy());
    println!("degraded:  {}", state_after.is_degraded());
    if let Some(err) = state_after.last_error() {
        println!("last error: {err}");
    }

    #[cfg(all(feature = "hid", target_os = "windows"))]
    hid_report();
}

#[cfg(all(feature = "hid", target_os = "windows"))]
fn hid_report() {
    use hidapi::HidApi;
    use rawtrail::backends::hid::{probe_mice, HidMouse};
    use rawtrail::decode::ButtonSet;
    use std::time::Instant;

    let api = HidApi::new().expect("init hidapi");
    let mice = probe_mice(&api);
    println!("\n{} HID mouse endpoint(s)", mice.len());
    for m in &mice {
        println!(
            "VID:PID={:04x}:{:04x} up=0x{:02x} u=0x{:02x} prod={:?} mfr={:?} path={}",
            m.vid, m.pid, m.usage_page, m.usage, m.product, m.manufacturer, m.path
        );
    }

    let Some(first) = mice.first() else { return };
    let mouse = match HidMouse::open(&api, first) {
        Ok(m) => m,
        Err(e) => {
            println!("cannot open {}: {e} (in use by the OS or needs elevation)", first.path);
            return;
        }
    };

    println!("\nreading 10 reports from {:?}", mouse.info().product);
    let mut prev = ButtonSet::empty();
    let mut buf = [0u8; 64];
    for i in 1..=10 {
        match mouse.read_raw(&mut buf, Duration::from_millis(100)) {
            Ok(0) => println!("#{i:02}: no data (timeout)"),
            Ok(n) => {
                let hex: Vec<String> = buf[..n].iter().map(|b| format!("{b:02X}")).collect();
                println!("#{i:02}: {}", hex.join(" "));
                if let Some(report) = rawtrail::backends::hid::parse_boot_report(&buf[..n]) {
                    for ev in report.to_events(prev, Instant::now()) {
                        println!("      {ev}");
                    }
                    prev = report.buttons;
                }
            }
            Err(e) => {
                println!("#{i:02}: {e}");
                break;
            }
        }
    }
}
