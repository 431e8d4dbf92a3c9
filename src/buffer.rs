//! Fixed-capacity event buffer with a drop-oldest overflow policy.
//!
//! The buffer is a plain data structure; the owning queue wraps it in a
//! mutex together with the timestamp table and signals its condition
//! variable once per push. Capture must never block on a slow consumer,
//! so a full buffer evicts its oldest unread entry instead of rejecting
//! the new one.

use std::collections::VecDeque;

use crate::event::KeyEvent;

/// Bounded FIFO of [`KeyEvent`]s.
#[derive(Debug)]
pub struct EventBuffer {
    slots: usize,
    events: VecDeque<KeyEvent>,
}

impl EventBuffer {
    /// Create a buffer holding at most `slots` events. A slot count of
    /// zero is clamped to one so a push can always succeed.
    pub fn new(slots: usize) -> Self {
        let slots = slots.max(1);
        Self {
            slots,
            events: VecDeque::with_capacity(slots),
        }
    }

    /// Append an event, evicting the oldest unread entry if the buffer is
    /// full. Returns the evicted event, if any.
    pub fn push(&mut self, event: KeyEvent) -> Option<KeyEvent> {
        let evicted = if self.events.len() == self.slots {
            self.events.pop_front()
        } else {
            None
        };
        self.events.push_back(event);
        evicted
    }

    /// Remove and return the oldest event. Never blocks.
    pub fn pop(&mut self) -> Option<KeyEvent> {
        self.events.pop_front()
    }

    /// Discard all buffered events, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let n = self.events.len();
        self.events.clear();
        n
    }

    /// Number of unread events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer holds no unread events.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Configured slot count.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Most recent buffered event for an element code, scanning backward.
    /// Read-only; used for touch-point coalescing.
    pub fn last_matching(&self, code: u16) -> Option<&KeyEvent> {
        self.events.iter().rev().find(|e| e.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(n: u16) -> KeyEvent {
        KeyEvent::key(n as f64, n, true)
    }

    #[test]
    fn test_push_pop_order() {
        let mut buf = EventBuffer::new(8);
        for n in 0..4 {
            assert!(buf.push(press(n)).is_none());
        }
        assert_eq!(buf.len(), 4);
        for n in 0..4 {
            assert_eq!(buf.pop().unwrap().code, n);
        }
        assert!(buf.pop().is_none());
    }

    #[test]
    fn test_drop_oldest_bound() {
        // 20 events into a 16-slot buffer: exactly 16 survive, and they
        // are events 5..=20 in original order.
        let mut buf = EventBuffer::new(16);
        let mut evicted = 0;
        for n in 1..=20 {
            if buf.push(press(n)).is_some() {
                evicted += 1;
            }
        }
        assert_eq!(evicted, 4);
        assert_eq!(buf.len(), 16);
        for n in 5..=20 {
            assert_eq!(buf.pop().unwrap().code, n);
        }
        assert!(buf.is_empty());
    }

    #[test]
    fn test_clear_reports_count() {
        let mut buf = EventBuffer::new(4);
        buf.push(press(1));
        buf.push(press(2));
        assert_eq!(buf.clear(), 2);
        assert!(buf.is_empty());
        assert_eq!(buf.clear(), 0);
    }

    #[test]
    fn test_zero_slots_clamped() {
        let mut buf = EventBuffer::new(0);
        assert_eq!(buf.slots(), 1);
        assert!(buf.push(press(1)).is_none());
        assert_eq!(buf.push(press(2)).unwrap().code, 1);
        assert_eq!(buf.pop().unwrap().code, 2);
    }

    #[test]
    fn test_last_matching_scans_backward() {
        let mut buf = EventBuffer::new(8);
        buf.push(KeyEvent::sample(1.0, 300, vec![0.1]));
        buf.push(press(5));
        buf.push(KeyEvent::sample(2.0, 300, vec![0.9]));

        let found = buf.last_matching(300).unwrap();
        assert_eq!(found.valuators, vec![0.9]);
        assert!(buf.last_matching(301).is_none());
        // The scan does not consume anything.
        assert_eq!(buf.len(), 3);
    }
}
