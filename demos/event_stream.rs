//! Stream events from a synthetic device over a channel.
//!
//! Run with: cargo run --example event_stream
//!
//! No hardware access needed: a background thread plays a scripted
//! burst of keystrokes into a synthetic capture source, and the main
//! thread receives the cooked events from a channel.

use std::sync::Arc;
use std::time::Duration;

use hidqueue::channel::events_channel;
use hidqueue::registry::{CreateFlags, QueueRegistry};
use hidqueue::source::SyntheticInjector;
use hidqueue::{DeviceCaps, ScanFilter, StaticProvider};

fn main() {
    env_logger::init();

    let injector = SyntheticInjector::new();
    let source_state = injector.clone();
    let provider = StaticProvider::new().with_device(
        DeviceCaps {
            index: 0,
            name: "scripted keyboard".into(),
            is_keyboard: true,
            num_valuators: 0,
        },
        move || Ok(Box::new(source_state.source())),
    );

    let registry = QueueRegistry::new(Arc::new(provider));
    registry
        .create(0, ScanFilter::all(), 0, 64, CreateFlags::default())
        .expect("create failed");
    registry.start(0).expect("start failed");

    // Type "hi" with a shift-modified exclamation mark at the end.
    let script = std::thread::spawn(move || {
        let taps: &[(u16, f64)] = &[(35, 0.10), (23, 0.25), (42, 0.40), (2, 0.45)];
        for &(code, at) in taps {
            std::thread::sleep(Duration::from_millis(80));
            injector.press(code, at);
            injector.release(code, at + 0.03);
        }
    });

    let queue = registry.queue(0).expect("queue vanished");
    let (handle, rx) = events_channel(queue, 32);

    while let Ok(event) = rx.recv_timeout(Duration::from_millis(500)) {
        let arrow = if event.pressed { "down" } else { "up  " };
        let cooked = char::from_u32(event.cooked.max(0) as u32)
            .filter(|c| !c.is_control() && event.cooked > 0)
            .map(|c| format!(" '{c}'"))
            .unwrap_or_default();
        println!("{:.3}s  code {:3} {arrow}{cooked}", event.time, event.code);
    }

    script.join().unwrap();
    handle.stop().expect("forwarder stop failed");
    registry.release(0).expect("release failed");
}
