//! Error types for the event queue library.

use thiserror::Error;

/// Result type alias for hidqueue operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while managing input event queues.
#[derive(Debug, Error)]
pub enum Error {
    /// The device index is not known to the device provider.
    #[error("no such device: index {0}")]
    InvalidDevice(u32),

    /// A queue already exists for this device and exclusive creation was requested.
    #[error("a queue already exists for device {0}")]
    AlreadyExists(u32),

    /// No queue exists for this device index.
    #[error("no queue exists for device {0}")]
    NoSuchQueue(u32),

    /// The capture source could not be opened, or failed while running.
    #[error("capture unavailable: {0}")]
    CaptureUnavailable(String),

    /// The requested operation is not supported on this platform.
    #[error("not supported: {0}")]
    NotSupported(String),

    /// Thread-related error.
    #[error("thread error: {0}")]
    ThreadError(String),
}
