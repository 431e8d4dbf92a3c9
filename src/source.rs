//! The capture source seam between the queue core and the platform.
//!
//! A [`CaptureSource`] delivers raw transitions one at a time with a
//! bounded wait, so the capture worker can interleave source reads with
//! stop-flag checks. Platform adapters live in [`crate::platform`]; the
//! [`SyntheticSource`] here lets tests and replay tools inject
//! transitions with exact timestamps.

use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::error::Result;
use crate::event::Position;

/// Payload of a raw transition.
#[derive(Debug, Clone)]
pub enum TransitionKind {
    /// A digital element went down.
    Press,
    /// A digital element went up.
    Release,
    /// A continuous-axis sample; does not touch the timestamp table.
    Sample {
        /// Valuator values carried by the sample.
        valuators: Vec<f64>,
        /// Position for pointer/touch-like devices.
        position: Option<Position>,
    },
}

/// One raw transition as delivered by a capture source.
#[derive(Debug, Clone)]
pub struct RawTransition {
    /// Timestamp in [`crate::timebase`] seconds.
    pub time: f64,
    /// Device-reported element code.
    pub code: u16,
    /// What happened.
    pub kind: TransitionKind,
}

impl RawTransition {
    /// A press transition.
    pub fn press(time: f64, code: u16) -> Self {
        Self {
            time,
            code,
            kind: TransitionKind::Press,
        }
    }

    /// A release transition.
    pub fn release(time: f64, code: u16) -> Self {
        Self {
            time,
            code,
            kind: TransitionKind::Release,
        }
    }

    /// A valuator sample.
    pub fn sample(time: f64, code: u16, valuators: Vec<f64>) -> Self {
        Self {
            time,
            code,
            kind: TransitionKind::Sample {
                valuators,
                position: None,
            },
        }
    }
}

/// Platform-specific mechanism delivering raw input transitions.
///
/// Exactly one source instance exists per running queue; it is owned by
/// the capture worker thread, which is the only caller of these methods.
pub trait CaptureSource: Send {
    /// Wait up to `timeout` for the next transition. `Ok(None)` means the
    /// wait timed out; an error means the source has failed irrecoverably
    /// and the worker should shut the queue down.
    fn next_transition(&mut self, timeout: Duration) -> Result<Option<RawTransition>>;

    /// Release any underlying OS resources. Called once, from the worker,
    /// after the last `next_transition`.
    fn close(&mut self) {}
}

#[derive(Default)]
struct SynthState {
    pending: VecDeque<RawTransition>,
    closed: bool,
}

/// Injects transitions into paired [`SyntheticSource`]s.
///
/// Cloning the injector shares the same underlying stream, and a source
/// opened after events were injected still sees them; this mirrors a
/// device whose kernel buffer outlives open/close cycles.
#[derive(Clone, Default)]
pub struct SyntheticInjector {
    state: Arc<(Mutex<SynthState>, Condvar)>,
}

impl SyntheticInjector {
    /// Create an injector with an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a source reading from this injector's stream. Re-arms a
    /// stream that a previous source had closed.
    pub fn source(&self) -> SyntheticSource {
        let (lock, _) = &*self.state;
        lock.lock().expect("synthetic source lock poisoned").closed = false;
        SyntheticSource {
            state: Arc::clone(&self.state),
        }
    }

    /// Queue a transition for delivery.
    pub fn inject(&self, transition: RawTransition) {
        let (lock, cvar) = &*self.state;
        let mut state = lock.lock().expect("synthetic source lock poisoned");
        state.pending.push_back(transition);
        cvar.notify_one();
    }

    /// Queue a press for `code` at `time`.
    pub fn press(&self, code: u16, time: f64) {
        self.inject(RawTransition::press(time, code));
    }

    /// Queue a release for `code` at `time`.
    pub fn release(&self, code: u16, time: f64) {
        self.inject(RawTransition::release(time, code));
    }

    /// Queue a valuator sample for `code` at `time`.
    pub fn sample(&self, code: u16, time: f64, valuators: Vec<f64>) {
        self.inject(RawTransition::sample(time, code, valuators));
    }
}

/// In-memory [`CaptureSource`] fed by a [`SyntheticInjector`].
pub struct SyntheticSource {
    state: Arc<(Mutex<SynthState>, Condvar)>,
}

impl CaptureSource for SyntheticSource {
    fn next_transition(&mut self, timeout: Duration) -> Result<Option<RawTransition>> {
        let (lock, cvar) = &*self.state;
        let guard = lock.lock().expect("synthetic source lock poisoned");
        let (mut guard, _) = cvar
            .wait_timeout_while(guard, timeout, |s| s.pending.is_empty() && !s.closed)
            .expect("synthetic source lock poisoned");
        Ok(guard.pending.pop_front())
    }

    fn close(&mut self) {
        let (lock, cvar) = &*self.state;
        // Leave pending transitions in place for a later re-open; only
        // wake anyone still blocked on this stream.
        lock.lock().expect("synthetic source lock poisoned").closed = true;
        cvar.notify_all();
    }
}
