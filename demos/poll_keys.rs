//! Poll a real input device for ten seconds and summarize key activity.
//!
//! Run with: cargo run --example poll_keys [device_index]
//!
//! On Linux this needs read access to /dev/input (the 'input' group).

use std::time::{Duration, Instant};

use hidqueue::registry::{self, CreateFlags};
use hidqueue::ScanFilter;

fn main() {
    env_logger::init();

    let index: u32 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(0);

    if let Err(e) = registry::create(index, ScanFilter::all(), 0, 128, CreateFlags::default()) {
        eprintln!("cannot create queue for device {index}: {e}");
        return;
    }
    if let Err(e) = registry::start(index) {
        eprintln!("cannot start capture for device {index}: {e}");
        let _ = registry::release(index);
        return;
    }

    println!("capturing device {index} for 10 seconds, press some keys...");
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(100));

        let report = registry::check(index).expect("queue vanished");
        if !report.any_pressed {
            continue;
        }
        for code in 0..256 {
            if report.first_press[code] != 0.0 {
                println!(
                    "  key {code:3}: first down {:.4}s, last down {:.4}s",
                    report.first_press[code], report.last_press[code]
                );
            }
        }
    }

    let unread = registry::flush(index).expect("queue vanished");
    println!("done; {unread} unread events discarded");
    registry::release(index).expect("release failed");
}
