//! evdev-backed device provider and capture source.

use std::collections::VecDeque;
use std::fs;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use evdev::{Device, EventType as EvdevEventType, InputEventKind, Key as EvdevKey};

use crate::device::{DeviceCaps, DeviceProvider, ScanFilter};
use crate::error::{Error, Result};
use crate::source::{CaptureSource, RawTransition, TransitionKind};
use crate::timebase;

/// Element codes for absolute axes start here (ABS_X maps to 256).
pub const ABS_VALUATOR_BASE: u16 = 256;
/// Element codes for relative axes start here (REL_X maps to 512).
pub const REL_VALUATOR_BASE: u16 = 512;

/// Enumerate /dev/input/event* nodes in stable numeric order.
///
/// The position in this list is the device index; it stays stable for the
/// process lifetime as long as no devices are hot-plugged.
fn device_paths() -> Result<Vec<PathBuf>> {
    let dir = fs::read_dir("/dev/input").map_err(|e| {
        Error::CaptureUnavailable(format!(
            "cannot access /dev/input: {e}. Make sure you're in the 'input' group."
        ))
    })?;

    let mut numbered: Vec<(u32, PathBuf)> = Vec::new();
    for entry in dir.flatten() {
        let path = entry.path();
        if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
            if let Some(suffix) = name.strip_prefix("event") {
                if let Ok(n) = suffix.parse::<u32>() {
                    numbered.push((n, path));
                }
            }
        }
    }
    numbered.sort_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, p)| p).collect())
}

fn open_device(path: &Path) -> Result<Device> {
    Device::open(path).map_err(|e| {
        Error::CaptureUnavailable(format!("cannot open {}: {e}", path.display()))
    })
}

/// Provider enumerating evdev devices under /dev/input.
#[derive(Default)]
pub struct EvdevProvider;

impl EvdevProvider {
    /// Create a provider. Enumeration happens per call, not up front, so
    /// construction is free and never fails.
    pub fn new() -> Self {
        Self
    }
}

impl DeviceProvider for EvdevProvider {
    fn resolve(&self, index: u32) -> Result<DeviceCaps> {
        let paths = device_paths()?;
        let path = paths
            .get(index as usize)
            .ok_or(Error::InvalidDevice(index))?;
        let device = open_device(path)?;

        let is_keyboard = device
            .supported_keys()
            .is_some_and(|keys| keys.contains(EvdevKey::KEY_A));
        let abs = device
            .supported_absolute_axes()
            .map_or(0, |axes| axes.iter().count());
        let rel = device
            .supported_relative_axes()
            .map_or(0, |axes| axes.iter().count());

        Ok(DeviceCaps {
            index,
            name: device.name().unwrap_or("unknown").to_string(),
            is_keyboard,
            num_valuators: (abs + rel) as u32,
        })
    }

    fn open(&self, index: u32, _filter: &ScanFilter) -> Result<Box<dyn CaptureSource>> {
        let paths = device_paths()?;
        let path = paths
            .get(index as usize)
            .ok_or(Error::InvalidDevice(index))?;
        let device = open_device(path)?;

        let supported = device.supported_events();
        if !supported.contains(EvdevEventType::KEY)
            && !supported.contains(EvdevEventType::ABSOLUTE)
            && !supported.contains(EvdevEventType::RELATIVE)
        {
            return Err(Error::CaptureUnavailable(format!(
                "{} reports no key or axis events",
                path.display()
            )));
        }

        log::debug!(
            "opened {} ({})",
            path.display(),
            device.name().unwrap_or("unknown")
        );
        Ok(Box::new(EvdevSource {
            device,
            pending: VecDeque::new(),
        }))
    }
}

/// Capture source reading one evdev device.
struct EvdevSource {
    device: Device,
    pending: VecDeque<RawTransition>,
}

impl CaptureSource for EvdevSource {
    fn next_transition(&mut self, timeout: Duration) -> Result<Option<RawTransition>> {
        if let Some(transition) = self.pending.pop_front() {
            return Ok(Some(transition));
        }

        let mut pfd = libc::pollfd {
            fd: self.device.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(i32::MAX as u128) as i32;
        let ret = unsafe { libc::poll(&mut pfd, 1, millis) };

        if ret < 0 {
            let err = std::io::Error::last_os_error();
            if err.kind() == std::io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(Error::CaptureUnavailable(format!("poll error: {err}")));
        }
        if ret == 0 {
            return Ok(None);
        }

        let events = self
            .device
            .fetch_events()
            .map_err(|e| Error::CaptureUnavailable(format!("read failed: {e}")))?;
        let now = timebase::now();
        for ev in events {
            match ev.kind() {
                InputEventKind::Key(key) => {
                    // value 2 is the kernel's autorepeat, not a transition
                    let kind = match ev.value() {
                        1 => TransitionKind::Press,
                        0 => TransitionKind::Release,
                        _ => continue,
                    };
                    self.pending.push_back(RawTransition {
                        time: now,
                        code: key.code(),
                        kind,
                    });
                }
                InputEventKind::AbsAxis(axis) => {
                    self.pending.push_back(RawTransition::sample(
                        now,
                        ABS_VALUATOR_BASE + axis.0,
                        vec![ev.value() as f64],
                    ));
                }
                InputEventKind::RelAxis(axis) => {
                    self.pending.push_back(RawTransition::sample(
                        now,
                        REL_VALUATOR_BASE + axis.0,
                        vec![ev.value() as f64],
                    ));
                }
                _ => {}
            }
        }
        Ok(self.pending.pop_front())
    }
}
