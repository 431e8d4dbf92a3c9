//! # hidqueue
//!
//! Asynchronous HID input event queues with per-key press/release
//! timestamps.
//!
//! ## Features
//!
//! - One background capture thread per device; consumers never poll the
//!   hardware themselves
//! - Sub-millisecond monotonic timestamps on every transition
//! - Per-key first/last press and release times, consumed atomically by
//!   `check` so nothing is ever reported twice
//! - Bounded event buffer with a drop-oldest policy; capture never blocks
//!   on a slow consumer
//! - Scan filters, per-queue modifier tracking, and character cooking for
//!   keyboard-class devices
//! - Valuator (continuous-axis) samples alongside digital transitions
//!
//! ## Quick Start
//!
//! ```no_run
//! use hidqueue::registry::{self, CreateFlags};
//! use hidqueue::ScanFilter;
//!
//! // Queue for device 0, all keys, 128 buffer slots.
//! registry::create(0, ScanFilter::all(), 0, 128, CreateFlags::default()).unwrap();
//! registry::start(0).unwrap();
//!
//! // ... render a trial, run a task, sleep ...
//!
//! let report = registry::check(0).unwrap();
//! if report.any_pressed {
//!     for code in 0..256 {
//!         if report.first_press[code] != 0.0 {
//!             println!("key {code} first down at {:.4}s", report.first_press[code]);
//!         }
//!     }
//! }
//! registry::release(0).unwrap();
//! ```
//!
//! ## Architecture
//!
//! Each queue pairs a capture worker with a mutex-guarded event buffer
//! and timestamp table (see [`queue`]). Platform specifics are confined
//! to a [`device::DeviceProvider`] and a [`source::CaptureSource`]; the
//! synthetic source in [`source`] drives the same pipeline from injected
//! transitions, which is how the crate tests itself and how replay
//! tooling can feed recorded streams through a queue.

pub mod buffer;
pub mod channel;
pub mod device;
pub mod error;
pub mod event;
pub mod keymap;
pub mod queue;
pub mod registry;
pub mod source;
pub mod state;
pub mod timebase;
pub mod timestamps;

mod platform;

// Re-exports
pub use device::{DeviceCaps, DeviceProvider, ScanFilter, StaticProvider};
pub use error::{Error, Result};
pub use event::{COOKED_NONE, COOKED_UNMAPPED, KeyEvent, NUM_KEYS, Position};
pub use platform::{UnsupportedProvider, default_provider};
#[cfg(all(target_os = "linux", feature = "evdev"))]
pub use platform::EvdevProvider;
pub use queue::{InterruptSink, Queue, QueuePhase};
pub use registry::{CreateFlags, QueueRegistry};
pub use source::{CaptureSource, RawTransition, SyntheticInjector, SyntheticSource, TransitionKind};
pub use timestamps::KeyReport;
