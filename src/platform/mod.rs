//! Platform-specific device providers.
//!
//! Each platform contributes only a [`DeviceProvider`] and a
//! [`crate::source::CaptureSource`]; the worker loop, buffering, and
//! timestamp bookkeeping are platform-independent. Targets without a
//! backend get a provider that reports every operation as unsupported,
//! so the synthetic pieces keep working everywhere.

use std::sync::Arc;

use crate::device::DeviceProvider;

#[cfg(all(target_os = "linux", feature = "evdev"))]
mod linux;
#[cfg(all(target_os = "linux", feature = "evdev"))]
pub use linux::EvdevProvider;

mod unsupported;
pub use unsupported::UnsupportedProvider;

/// The default provider for this platform.
pub fn default_provider() -> Arc<dyn DeviceProvider> {
    #[cfg(all(target_os = "linux", feature = "evdev"))]
    {
        Arc::new(linux::EvdevProvider::new())
    }
    #[cfg(not(all(target_os = "linux", feature = "evdev")))]
    {
        Arc::new(UnsupportedProvider)
    }
}
