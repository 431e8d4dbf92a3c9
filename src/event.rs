//! Event types for the input queue library.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of element codes tracked per queue (digital keys and buttons).
pub const NUM_KEYS: usize = 256;

/// Cooked-code sentinel: the event carries no mapped character.
pub const COOKED_NONE: i32 = -1;

/// Cooked-code sentinel: the raw code had no mapping under the current modifiers.
pub const COOKED_UNMAPPED: i32 = 0;

/// Screen-space position attached to pointer/touch-like events.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    /// Absolute X in device coordinates.
    pub x: f64,
    /// Absolute Y in device coordinates.
    pub y: f64,
    /// X normalized to `0.0..=1.0` over the device surface.
    pub norm_x: f64,
    /// Y normalized to `0.0..=1.0` over the device surface.
    pub norm_y: f64,
}

/// A canonical, timestamped input transition.
///
/// Published by a queue's capture worker and immutable from then on.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KeyEvent {
    /// Monotonic timestamp in seconds (see [`crate::timebase`]).
    pub time: f64,
    /// Raw element code as reported by the device. Digital keys and
    /// buttons use 0–255; valuator channels may use larger codes.
    pub code: u16,
    /// Mapped character code: [`COOKED_NONE`] for non-keyboard events,
    /// [`COOKED_UNMAPPED`] when no mapping exists, `> 0` otherwise.
    pub cooked: i32,
    /// `true` for a press, `false` for a release. Valuator samples carry
    /// the element's most recent boolean state.
    pub pressed: bool,
    /// Valuator values sampled with this transition, if any.
    pub valuators: Vec<f64>,
    /// Position for pointer/touch-like devices.
    pub position: Option<Position>,
}

impl KeyEvent {
    /// Create a digital press/release event.
    pub fn key(time: f64, code: u16, pressed: bool) -> Self {
        Self {
            time,
            code,
            cooked: COOKED_NONE,
            pressed,
            valuators: Vec::new(),
            position: None,
        }
    }

    /// Create a valuator sample event.
    pub fn sample(time: f64, code: u16, valuators: Vec<f64>) -> Self {
        Self {
            time,
            code,
            cooked: COOKED_NONE,
            pressed: false,
            valuators,
            position: None,
        }
    }

    /// Attach a cooked character code.
    pub fn with_cooked(mut self, cooked: i32) -> Self {
        self.cooked = cooked;
        self
    }

    /// Attach a position.
    pub fn with_position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    /// Whether this event is a digital transition (as opposed to a pure
    /// valuator sample).
    pub fn is_digital(&self) -> bool {
        self.valuators.is_empty()
    }

    /// Whether the element code falls in the per-key tracked range.
    pub fn is_tracked_key(&self) -> bool {
        (self.code as usize) < NUM_KEYS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_event_constructors() {
        let press = KeyEvent::key(1.5, 30, true);
        assert!(press.pressed);
        assert!(press.is_digital());
        assert!(press.is_tracked_key());
        assert_eq!(press.cooked, COOKED_NONE);

        let sample = KeyEvent::sample(2.0, 400, vec![0.25, 0.75]);
        assert!(!sample.is_digital());
        assert!(!sample.is_tracked_key());
        assert_eq!(sample.valuators.len(), 2);
    }

    #[test]
    fn test_with_cooked_and_position() {
        let ev = KeyEvent::key(0.1, 46, true)
            .with_cooked('c' as i32)
            .with_position(Position {
                x: 10.0,
                y: 20.0,
                norm_x: 0.5,
                norm_y: 0.25,
            });
        assert_eq!(ev.cooked, 'c' as i32);
        assert_eq!(ev.position.unwrap().norm_y, 0.25);
    }
}
