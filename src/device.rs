//! Device capabilities and the provider seam.
//!
//! The queue core never talks to the operating system directly. A
//! [`DeviceProvider`] resolves a small integer device index to a
//! capability snapshot and opens a [`CaptureSource`] for it. The
//! production provider lives in [`crate::platform`]; [`StaticProvider`]
//! serves tests and synthetic setups.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::event::NUM_KEYS;
use crate::source::CaptureSource;

/// Capability snapshot for one physical or virtual input device.
///
/// The queue core holds a copy taken at create time; later changes to the
/// underlying device do not affect an existing queue.
#[derive(Debug, Clone)]
pub struct DeviceCaps {
    /// Stable device index for the process lifetime.
    pub index: u32,
    /// Human-readable device name.
    pub name: String,
    /// Whether the device is keyboard-class (enables character cooking
    /// and the console interrupt combination).
    pub is_keyboard: bool,
    /// Number of continuous-axis channels the device supports.
    pub num_valuators: u32,
}

/// Which of the 256 tracked element codes a queue should accept.
///
/// Codes at or above 256 can only be valuator samples and always pass.
#[derive(Clone)]
pub struct ScanFilter {
    accept: [bool; NUM_KEYS],
}

impl Default for ScanFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl ScanFilter {
    /// Accept every element code.
    pub fn all() -> Self {
        Self {
            accept: [true; NUM_KEYS],
        }
    }

    /// Accept only the listed codes; codes outside 0–255 are ignored.
    pub fn only(codes: &[u16]) -> Self {
        let mut accept = [false; NUM_KEYS];
        for &code in codes {
            if (code as usize) < NUM_KEYS {
                accept[code as usize] = true;
            }
        }
        Self { accept }
    }

    /// Whether a transition with this element code passes the filter.
    pub fn accepts(&self, code: u16) -> bool {
        match self.accept.get(code as usize) {
            Some(&flag) => flag,
            None => true, // valuator-only codes bypass the key filter
        }
    }
}

impl std::fmt::Debug for ScanFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let accepted = self.accept.iter().filter(|&&a| a).count();
        write!(f, "ScanFilter({accepted}/{NUM_KEYS})")
    }
}

/// Resolves device indices and opens capture sources for them.
pub trait DeviceProvider: Send + Sync {
    /// Look up the capability snapshot for a device index.
    fn resolve(&self, index: u32) -> Result<DeviceCaps>;

    /// Open a capture source for the device. Called by `start`, never by
    /// `create`, so creation cannot fail for platform reasons.
    fn open(&self, index: u32, filter: &ScanFilter) -> Result<Box<dyn CaptureSource>>;
}

/// Factory invoked on every `start` to produce a fresh capture source.
pub type SourceFactory = Box<dyn Fn() -> Result<Box<dyn CaptureSource>> + Send + Sync>;

/// A fixed set of devices with caller-supplied source factories.
#[derive(Default)]
pub struct StaticProvider {
    devices: HashMap<u32, (DeviceCaps, SourceFactory)>,
}

impl StaticProvider {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a device under its capability index.
    pub fn with_device<F>(mut self, caps: DeviceCaps, factory: F) -> Self
    where
        F: Fn() -> Result<Box<dyn CaptureSource>> + Send + Sync + 'static,
    {
        self.devices.insert(caps.index, (caps, Box::new(factory)));
        self
    }
}

impl DeviceProvider for StaticProvider {
    fn resolve(&self, index: u32) -> Result<DeviceCaps> {
        self.devices
            .get(&index)
            .map(|(caps, _)| caps.clone())
            .ok_or(Error::InvalidDevice(index))
    }

    fn open(&self, index: u32, _filter: &ScanFilter) -> Result<Box<dyn CaptureSource>> {
        let (_, factory) = self
            .devices
            .get(&index)
            .ok_or(Error::InvalidDevice(index))?;
        factory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SyntheticInjector;

    fn caps(index: u32) -> DeviceCaps {
        DeviceCaps {
            index,
            name: format!("synthetic-{index}"),
            is_keyboard: true,
            num_valuators: 0,
        }
    }

    #[test]
    fn test_scan_filter_all_and_only() {
        let all = ScanFilter::all();
        assert!(all.accepts(0));
        assert!(all.accepts(255));

        let some = ScanFilter::only(&[5, 9]);
        assert!(some.accepts(5));
        assert!(some.accepts(9));
        assert!(!some.accepts(6));
        // Valuator-only codes bypass the key filter.
        assert!(some.accepts(300));
    }

    #[test]
    fn test_static_provider_resolve_and_open() {
        let injector = SyntheticInjector::new();
        let source_state = injector.clone();
        let provider = StaticProvider::new()
            .with_device(caps(3), move || Ok(Box::new(source_state.source())));

        assert_eq!(provider.resolve(3).unwrap().name, "synthetic-3");
        assert!(matches!(
            provider.resolve(4),
            Err(Error::InvalidDevice(4))
        ));
        assert!(provider.open(3, &ScanFilter::all()).is_ok());
        assert!(provider.open(4, &ScanFilter::all()).is_err());
    }

    #[test]
    fn test_static_provider_failing_factory() {
        let provider = StaticProvider::new().with_device(caps(0), || {
            Err(Error::CaptureUnavailable("unplugged".into()))
        });
        assert!(provider.resolve(0).is_ok());
        assert!(matches!(
            provider.open(0, &ScanFilter::all()),
            Err(Error::CaptureUnavailable(_))
        ));
    }
}
