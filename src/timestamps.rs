//! Per-key first/last press and release timestamps.
//!
//! Gives consumers a cheap "was this key hit, and when" summary without
//! draining every buffered event. A zero slot means "no unconsumed event";
//! real timestamps are always positive because the monotonic clock is
//! anchored before any capture worker runs.

use crate::event::NUM_KEYS;

/// Snapshot returned by [`TimestampTable::take`].
#[derive(Debug, Clone)]
pub struct KeyReport {
    /// Whether any key has an unconsumed press.
    pub any_pressed: bool,
    /// Earliest unconsumed press time per key, zero if none.
    pub first_press: [f64; NUM_KEYS],
    /// Earliest unconsumed release time per key, zero if none.
    pub first_release: [f64; NUM_KEYS],
    /// Most recent unconsumed press time per key, zero if none.
    pub last_press: [f64; NUM_KEYS],
    /// Most recent unconsumed release time per key, zero if none.
    pub last_release: [f64; NUM_KEYS],
}

impl Default for KeyReport {
    fn default() -> Self {
        Self {
            any_pressed: false,
            first_press: [0.0; NUM_KEYS],
            first_release: [0.0; NUM_KEYS],
            last_press: [0.0; NUM_KEYS],
            last_release: [0.0; NUM_KEYS],
        }
    }
}

/// Four parallel 256-slot timestamp arrays, mutated by the capture worker
/// and consumed-on-read by check.
#[derive(Debug)]
pub struct TimestampTable {
    first_press: [f64; NUM_KEYS],
    first_release: [f64; NUM_KEYS],
    last_press: [f64; NUM_KEYS],
    last_release: [f64; NUM_KEYS],
}

impl Default for TimestampTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TimestampTable {
    /// Create a zeroed table.
    pub fn new() -> Self {
        Self {
            first_press: [0.0; NUM_KEYS],
            first_release: [0.0; NUM_KEYS],
            last_press: [0.0; NUM_KEYS],
            last_release: [0.0; NUM_KEYS],
        }
    }

    /// Record a digital transition. `last_*` is updated unconditionally;
    /// `first_*` only if the slot is still the zero sentinel.
    pub fn record(&mut self, code: u16, pressed: bool, time: f64) {
        let idx = code as usize;
        if idx >= NUM_KEYS {
            return;
        }
        if pressed {
            self.last_press[idx] = time;
            if self.first_press[idx] == 0.0 {
                self.first_press[idx] = time;
            }
        } else {
            self.last_release[idx] = time;
            if self.first_release[idx] == 0.0 {
                self.first_release[idx] = time;
            }
        }
    }

    /// Take a snapshot of all four arrays and reset them, in one step.
    /// A key reported by one take is never re-reported by the next.
    pub fn take(&mut self) -> KeyReport {
        let report = KeyReport {
            any_pressed: self.first_press.iter().any(|&t| t != 0.0),
            first_press: self.first_press,
            first_release: self.first_release,
            last_press: self.last_press,
            last_release: self.last_release,
        };
        self.clear();
        report
    }

    /// Zero all four arrays, discarding unconsumed state.
    pub fn clear(&mut self) {
        self.first_press = [0.0; NUM_KEYS];
        self.first_release = [0.0; NUM_KEYS];
        self.last_press = [0.0; NUM_KEYS];
        self.last_release = [0.0; NUM_KEYS];
    }
}
