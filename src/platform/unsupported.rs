//! Fallback provider for targets without a capture backend.

use crate::device::{DeviceCaps, DeviceProvider, ScanFilter};
use crate::error::{Error, Result};
use crate::source::CaptureSource;

/// Provider that reports every device as unsupported. Queues can still be
/// driven through [`crate::device::StaticProvider`] and the synthetic
/// source on such targets.
pub struct UnsupportedProvider;

impl DeviceProvider for UnsupportedProvider {
    fn resolve(&self, _index: u32) -> Result<DeviceCaps> {
        Err(Error::NotSupported(
            "no input capture backend for this platform".into(),
        ))
    }

    fn open(&self, _index: u32, _filter: &ScanFilter) -> Result<Box<dyn CaptureSource>> {
        Err(Error::NotSupported(
            "no input capture backend for this platform".into(),
        ))
    }
}
