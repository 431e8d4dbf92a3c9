//! Linux input capture via evdev.
//!
//! Reads transitions directly from /dev/input/event* devices, which works
//! on both X11 and Wayland sessions.

mod evdev;

pub use evdev::EvdevProvider;
