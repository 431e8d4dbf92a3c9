//! Channel-based event receiving for non-blocking consumers.
//!
//! This module bridges a running [`Queue`] to a channel, so applications
//! that already own an event loop can receive [`KeyEvent`]s without
//! calling `get_event` themselves. A forwarder thread drains the queue in
//! the background; the bounded channel drops events rather than stall it.
//!
//! # Example (Sync)
//!
//! ```no_run
//! use hidqueue::channel::events_channel;
//! use hidqueue::registry::{self, CreateFlags};
//! use hidqueue::ScanFilter;
//! use std::time::Duration;
//!
//! registry::create(0, ScanFilter::all(), 0, 64, CreateFlags::default()).unwrap();
//! registry::start(0).unwrap();
//!
//! let queue = registry::global().queue(0).unwrap();
//! let (handle, rx) = events_channel(queue, 100);
//!
//! while let Ok(event) = rx.recv_timeout(Duration::from_secs(5)) {
//!     println!("code {} at {:.4}s", event.code, event.time);
//! }
//!
//! handle.stop().unwrap();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};
use crate::event::KeyEvent;
use crate::queue::Queue;

/// How long each forwarder pass waits for an event before re-checking
/// its stop flag, in seconds.
const FORWARD_WAIT_SECS: f64 = 0.1;

/// Handle to control a forwarder started by [`events_channel`].
///
/// The forwarder also stops when this handle is dropped. Stopping the
/// forwarder does not stop the underlying queue.
pub struct EventChannelHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl EventChannelHandle {
    /// Stop the forwarder and wait for its thread to finish.
    pub fn stop(mut self) -> Result<()> {
        self.stop_inner()
    }

    /// Check if the forwarder is still running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn stop_inner(&mut self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            handle
                .join()
                .map_err(|_| Error::ThreadError("failed to join forwarder thread".into()))?;
        }
        Ok(())
    }
}

impl Drop for EventChannelHandle {
    fn drop(&mut self) {
        let _ = self.stop_inner();
    }
}

fn spawn_forwarder<F>(queue: Arc<Queue>, deliver: F) -> EventChannelHandle
where
    F: Fn(KeyEvent) + Send + 'static,
{
    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    let thread = thread::spawn(move || {
        while flag.load(Ordering::SeqCst) {
            match queue.get_event(FORWARD_WAIT_SECS) {
                Ok(Some(event)) => deliver(event),
                Ok(None) => {}
                Err(_) => break,
            }
        }
        flag.store(false, Ordering::SeqCst);
    });

    EventChannelHandle {
        running,
        thread: Some(thread),
    }
}

/// Forward a queue's events into a bounded channel.
///
/// If the channel fills up because the consumer is slow, further events
/// are dropped rather than blocking the forwarder; the queue's own
/// drop-oldest buffer remains the authoritative bound.
pub fn events_channel(
    queue: Arc<Queue>,
    capacity: usize,
) -> (EventChannelHandle, Receiver<KeyEvent>) {
    let (sender, receiver): (SyncSender<KeyEvent>, _) = mpsc::sync_channel(capacity);
    let handle = spawn_forwarder(queue, move |event| {
        let _ = sender.try_send(event);
    });
    (handle, receiver)
}

// ============================================================================
// Tokio async support (behind feature flag)
// ============================================================================

#[cfg(feature = "tokio")]
pub use tokio_channel::*;

#[cfg(feature = "tokio")]
mod tokio_channel {
    use super::*;
    use tokio::sync::mpsc as tokio_mpsc;

    /// Forward a queue's events into a tokio channel.
    ///
    /// The forwarder is still a plain thread, so this works from any
    /// runtime flavor; only the receiving side is async.
    pub fn events_channel_async(
        queue: Arc<Queue>,
        capacity: usize,
    ) -> (EventChannelHandle, tokio_mpsc::Receiver<KeyEvent>) {
        let (sender, receiver) = tokio_mpsc::channel(capacity);
        let handle = spawn_forwarder(queue, move |event| {
            let _ = sender.try_send(event);
        });
        (handle, receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{DeviceCaps, ScanFilter, StaticProvider};
    use crate::registry::{CreateFlags, QueueRegistry};
    use crate::source::SyntheticInjector;
    use std::time::Duration;

    fn running_queue() -> (QueueRegistry, Arc<Queue>, SyntheticInjector) {
        let injector = SyntheticInjector::new();
        let source_state = injector.clone();
        let provider = StaticProvider::new().with_device(
            DeviceCaps {
                index: 0,
                name: "synthetic-0".into(),
                is_keyboard: true,
                num_valuators: 0,
            },
            move || Ok(Box::new(source_state.source())),
        );
        let registry = QueueRegistry::new(Arc::new(provider));
        registry
            .create(0, ScanFilter::all(), 0, 64, CreateFlags::default())
            .unwrap();
        registry.start(0).unwrap();
        let queue = registry.queue(0).unwrap();
        (registry, queue, injector)
    }

    #[test]
    fn test_events_are_forwarded() {
        let (_registry, queue, injector) = running_queue();
        let (handle, rx) = events_channel(queue, 16);

        injector.press(30, 1.0);
        injector.release(30, 1.2);

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first.code, 30);
        assert!(first.pressed);
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(!second.pressed);

        assert!(handle.is_running());
        handle.stop().unwrap();
    }

    #[test]
    fn test_drop_stops_forwarder() {
        let (_registry, queue, injector) = running_queue();
        let (handle, rx) = events_channel(Arc::clone(&queue), 16);
        drop(handle);

        // The forwarder is gone; events stay in the queue for get_event.
        injector.press(5, 1.0);
        let event = queue.get_event(2.0).unwrap().expect("event in queue");
        assert_eq!(event.code, 5);
        assert!(rx.try_recv().is_err());
    }

    #[cfg(feature = "tokio")]
    #[tokio::test]
    async fn test_async_events_are_forwarded() {
        let (_registry, queue, injector) = running_queue();
        let (handle, mut rx) = events_channel_async(queue, 16);

        injector.press(46, 3.0);
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.code, 46);

        handle.stop().unwrap();
    }
}
