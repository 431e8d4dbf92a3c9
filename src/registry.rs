//! Registry mapping device indices to owned queues.
//!
//! The registry owns every [`Queue`] and its buffers; callers address
//! queues by device index and hold at most a reference-counted handle.
//! A process-global registry backed by the platform provider is
//! initialized lazily on first use, with free functions mirroring the
//! per-queue operations for the common one-registry case.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use crate::device::{DeviceProvider, ScanFilter};
use crate::error::{Error, Result};
use crate::event::KeyEvent;
use crate::platform;
use crate::queue::{InterruptSink, Queue};
use crate::timestamps::KeyReport;

/// Options for [`QueueRegistry::create`].
#[derive(Debug, Default, Clone, Copy)]
pub struct CreateFlags {
    /// Fail with [`Error::AlreadyExists`] instead of implicitly releasing
    /// an existing queue for the same device.
    pub exclusive: bool,
}

/// Owns the queues for a set of devices resolved through one provider.
pub struct QueueRegistry {
    provider: Arc<dyn DeviceProvider>,
    queues: Mutex<HashMap<u32, Arc<Queue>>>,
    interrupt: Mutex<Option<Arc<dyn InterruptSink>>>,
}

impl QueueRegistry {
    /// Create a registry over the given device provider.
    pub fn new(provider: Arc<dyn DeviceProvider>) -> Self {
        Self {
            provider,
            queues: Mutex::new(HashMap::new()),
            interrupt: Mutex::new(None),
        }
    }

    /// Install the console-interrupt collaborator handed to queues
    /// created after this call.
    pub fn set_interrupt_sink(&self, sink: Arc<dyn InterruptSink>) {
        if let Ok(mut guard) = self.interrupt.lock() {
            *guard = Some(sink);
        }
    }

    /// Create a queue for a device. Resolves capabilities through the
    /// provider but does not open the capture source; a queue that was
    /// never started costs nothing beyond its buffers.
    ///
    /// An existing queue for the same device is implicitly released
    /// first, unless `flags.exclusive` is set.
    pub fn create(
        &self,
        index: u32,
        filter: ScanFilter,
        num_valuators: usize,
        slots: usize,
        flags: CreateFlags,
    ) -> Result<()> {
        let caps = self.provider.resolve(index)?;
        let interrupt = self
            .interrupt
            .lock()
            .map_err(|_| Error::ThreadError("registry mutex poisoned".into()))?
            .clone();

        let mut queues = self.lock_queues()?;
        if queues.contains_key(&index) {
            if flags.exclusive {
                return Err(Error::AlreadyExists(index));
            }
            log::debug!("device {index}: replacing existing queue");
            if let Some(old) = queues.remove(&index) {
                old.stop()?;
            }
        }
        queues.insert(
            index,
            Arc::new(Queue::new(caps, filter, num_valuators, slots, interrupt)),
        );
        Ok(())
    }

    /// Handle to the queue for a device index.
    pub fn queue(&self, index: u32) -> Result<Arc<Queue>> {
        self.lock_queues()?
            .get(&index)
            .cloned()
            .ok_or(Error::NoSuchQueue(index))
    }

    /// Start capturing for a device.
    pub fn start(&self, index: u32) -> Result<()> {
        self.queue(index)?.start(self.provider.as_ref())
    }

    /// Stop capturing for a device; buffered events stay retrievable.
    pub fn stop(&self, index: u32) -> Result<()> {
        self.queue(index)?.stop()
    }

    /// Discard unread events and timestamps; returns the discard count.
    pub fn flush(&self, index: u32) -> Result<usize> {
        self.queue(index)?.flush()
    }

    /// Consume-and-return the per-key timestamp summary.
    pub fn check(&self, index: u32) -> Result<KeyReport> {
        self.queue(index)?.check()
    }

    /// Oldest buffered event, waiting up to `max_wait_secs`.
    pub fn get_event(&self, index: u32, max_wait_secs: f64) -> Result<Option<KeyEvent>> {
        self.queue(index)?.get_event(max_wait_secs)
    }

    /// Number of unread buffered events.
    pub fn available(&self, index: u32) -> Result<usize> {
        self.queue(index)?.available()
    }

    /// Stop and remove the queue for a device. Releasing an index with no
    /// queue is a no-op, so cleanup paths never need to track state.
    pub fn release(&self, index: u32) -> Result<()> {
        let removed = self.lock_queues()?.remove(&index);
        if let Some(queue) = removed {
            queue.stop()?;
            log::debug!("device {index}: queue released");
        }
        Ok(())
    }

    /// Release every queue; used at teardown.
    pub fn release_all(&self) -> Result<()> {
        let queues: Vec<Arc<Queue>> = self.lock_queues()?.drain().map(|(_, q)| q).collect();
        for queue in queues {
            queue.stop()?;
        }
        Ok(())
    }

    fn lock_queues(&self) -> Result<std::sync::MutexGuard<'_, HashMap<u32, Arc<Queue>>>> {
        self.queues
            .lock()
            .map_err(|_| Error::ThreadError("registry mutex poisoned".into()))
    }
}

impl Drop for QueueRegistry {
    fn drop(&mut self) {
        let _ = self.release_all();
    }
}

static GLOBAL: OnceLock<QueueRegistry> = OnceLock::new();

/// The process-global registry over the platform's default provider.
pub fn global() -> &'static QueueRegistry {
    GLOBAL.get_or_init(|| QueueRegistry::new(platform::default_provider()))
}

/// Create a queue for a device in the global registry.
pub fn create(
    index: u32,
    filter: ScanFilter,
    num_valuators: usize,
    slots: usize,
    flags: CreateFlags,
) -> Result<()> {
    global().create(index, filter, num_valuators, slots, flags)
}

/// Start capturing for a device in the global registry.
pub fn start(index: u32) -> Result<()> {
    global().start(index)
}

/// Stop capturing for a device in the global registry.
pub fn stop(index: u32) -> Result<()> {
    global().stop(index)
}

/// Flush a device's queue in the global registry.
pub fn flush(index: u32) -> Result<usize> {
    global().flush(index)
}

/// Check a device's queue in the global registry.
pub fn check(index: u32) -> Result<KeyReport> {
    global().check(index)
}

/// Get one event from a device's queue in the global registry.
pub fn get_event(index: u32, max_wait_secs: f64) -> Result<Option<KeyEvent>> {
    global().get_event(index, max_wait_secs)
}

/// Release a device's queue in the global registry.
pub fn release(index: u32) -> Result<()> {
    global().release(index)
}
