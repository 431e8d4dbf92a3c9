//! Monotonic time source shared by capture adapters and consumers.
//!
//! All event timestamps are seconds since an epoch anchored the first time
//! the clock is read in this process. Using [`Instant`] keeps the clock
//! monotonic across NTP adjustments, which matters when consumers compute
//! sub-millisecond reaction times from the difference of two stamps.

use std::sync::OnceLock;
use std::time::Instant;

static EPOCH: OnceLock<Instant> = OnceLock::new();

/// Seconds elapsed since the process-local epoch.
///
/// The first call anchors the epoch, so the very first reading is 0.0.
pub fn now() -> f64 {
    let epoch = *EPOCH.get_or_init(Instant::now);
    epoch.elapsed().as_secs_f64()
}
