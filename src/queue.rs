//! Per-device event queue: lifecycle state machine, capture worker, and
//! the query surface.
//!
//! A queue owns one background capture worker while running. The worker
//! drives the platform's [`CaptureSource`], normalizes each transition
//! into a [`KeyEvent`], and publishes it into the shared buffer and
//! timestamp table under a single mutex. Consumers poll through `check`,
//! `get_event`, and `flush`; only `get_event` may block, and only up to
//! its caller-supplied timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::buffer::EventBuffer;
use crate::device::{DeviceCaps, DeviceProvider, ScanFilter};
use crate::error::{Error, Result};
use crate::event::{COOKED_NONE, KeyEvent, NUM_KEYS};
use crate::keymap;
use crate::source::{CaptureSource, RawTransition, TransitionKind};
use crate::state::ModifierState;
use crate::timestamps::{KeyReport, TimestampTable};

/// How long the worker waits on the source before re-checking its stop flag.
const SOURCE_WAIT: Duration = Duration::from_millis(50);

/// Lifecycle phase of a queue. Release is represented by removal from the
/// registry, so a reachable queue is always in one of these three phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueuePhase {
    /// Created but never started, or start failed.
    Created,
    /// Capture worker is running.
    Running,
    /// Stopped; buffered events remain retrievable.
    Stopped,
}

/// Receives out-of-band console interrupt notifications (the
/// Ctrl+interrupt-key combination on keyboard-class queues).
pub trait InterruptSink: Send + Sync {
    /// Called from the capture worker, outside the queue lock.
    fn notify(&self);
}

/// Implement InterruptSink for closures.
impl<F> InterruptSink for F
where
    F: Fn() + Send + Sync,
{
    fn notify(&self) {
        self()
    }
}

/// State shared between the capture worker and consumers.
struct Inner {
    phase: QueuePhase,
    buffer: EventBuffer,
    table: TimestampTable,
    modifiers: ModifierState,
    /// Last observed boolean state per element code; valuator samples are
    /// stamped with it.
    key_state: [bool; NUM_KEYS],
    /// Failure reason from a worker that died irrecoverably; surfaced by
    /// the next `start`.
    capture_failed: Option<String>,
    /// Events evicted by the drop-oldest policy since the last start.
    dropped: u64,
}

struct Shared {
    inner: Mutex<Inner>,
    cond: Condvar,
}

/// Serialized by a dedicated mutex so concurrent lifecycle calls cannot
/// interleave a spawn with a join.
struct WorkerSlot {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

/// An asynchronous input event queue for one device.
pub struct Queue {
    caps: DeviceCaps,
    filter: ScanFilter,
    num_valuators: usize,
    slots: usize,
    shared: Arc<Shared>,
    worker: Mutex<WorkerSlot>,
    interrupt: Option<Arc<dyn InterruptSink>>,
}

impl Queue {
    /// Create a queue in the `Created` phase. Does not touch the capture
    /// source, so this cannot fail for platform reasons.
    pub fn new(
        caps: DeviceCaps,
        filter: ScanFilter,
        num_valuators: usize,
        slots: usize,
        interrupt: Option<Arc<dyn InterruptSink>>,
    ) -> Self {
        Self {
            caps,
            filter,
            num_valuators,
            slots,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    phase: QueuePhase::Created,
                    buffer: EventBuffer::new(slots),
                    table: TimestampTable::new(),
                    modifiers: ModifierState::new(),
                    key_state: [false; NUM_KEYS],
                    capture_failed: None,
                    dropped: 0,
                }),
                cond: Condvar::new(),
            }),
            worker: Mutex::new(WorkerSlot {
                running: Arc::new(AtomicBool::new(false)),
                handle: None,
            }),
            interrupt,
        }
    }

    /// Capability snapshot taken at create time.
    pub fn caps(&self) -> &DeviceCaps {
        &self.caps
    }

    /// Configured buffer slot count.
    pub fn slots(&self) -> usize {
        self.slots
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> QueuePhase {
        match self.shared.inner.lock() {
            Ok(inner) => inner.phase,
            Err(_) => QueuePhase::Stopped,
        }
    }

    /// Start capturing. Flushes stale state first, so starting is always
    /// idempotent with respect to pre-existing garbage. No-op when
    /// already running.
    ///
    /// Surfaces a pending worker failure as [`Error::CaptureUnavailable`]
    /// before retrying; a repeated call attempts a fresh open.
    pub fn start(&self, provider: &dyn DeviceProvider) -> Result<()> {
        let mut slot = self.lock_worker()?;

        {
            let mut inner = self.lock_inner()?;
            if inner.phase == QueuePhase::Running {
                return Ok(());
            }
            if let Some(reason) = inner.capture_failed.take() {
                return Err(Error::CaptureUnavailable(reason));
            }
        }

        // A worker that stopped itself still needs reaping before we can
        // spawn a new one.
        Self::join_worker(&mut slot)?;

        let source = provider.open(self.caps.index, &self.filter)?;

        {
            let mut inner = self.lock_inner()?;
            inner.buffer.clear();
            inner.table.clear();
            inner.modifiers.reset();
            inner.key_state = [false; NUM_KEYS];
            inner.dropped = 0;
            inner.phase = QueuePhase::Running;
        }

        let running = Arc::new(AtomicBool::new(true));
        let ctx = WorkerCtx {
            shared: Arc::clone(&self.shared),
            running: Arc::clone(&running),
            filter: self.filter.clone(),
            is_keyboard: self.caps.is_keyboard,
            num_valuators: self.num_valuators,
            interrupt: self.interrupt.clone(),
            index: self.caps.index,
        };
        let handle = std::thread::Builder::new()
            .name(format!("hidqueue-capture-{}", self.caps.index))
            .spawn(move || capture_loop(source, ctx))
            .map_err(|e| Error::ThreadError(format!("failed to spawn capture worker: {e}")))?;

        slot.running = running;
        slot.handle = Some(handle);
        log::debug!("device {}: capture started", self.caps.index);
        Ok(())
    }

    /// Stop capturing. Joins the worker, so no further writes occur once
    /// this returns. Buffered events and timestamps stay retrievable.
    /// No-op when not running.
    pub fn stop(&self) -> Result<()> {
        let mut slot = self.lock_worker()?;
        Self::join_worker(&mut slot)?;

        let mut inner = self.lock_inner()?;
        if inner.phase == QueuePhase::Running {
            inner.phase = QueuePhase::Stopped;
        }
        log::debug!("device {}: capture stopped", self.caps.index);
        Ok(())
    }

    /// Discard all unread events and zero the timestamp table. Returns
    /// the number of events discarded.
    pub fn flush(&self) -> Result<usize> {
        let mut inner = self.lock_inner()?;
        inner.table.clear();
        Ok(inner.buffer.clear())
    }

    /// Consume-and-return the per-key timestamp summary. A key reported
    /// once is never re-reported by a later check.
    pub fn check(&self) -> Result<KeyReport> {
        let mut inner = self.lock_inner()?;
        Ok(inner.table.take())
    }

    /// Remove and return the oldest buffered event, waiting up to
    /// `max_wait_secs` for one to arrive. A non-positive wait polls.
    pub fn get_event(&self, max_wait_secs: f64) -> Result<Option<KeyEvent>> {
        let mut inner = self.lock_inner()?;
        if inner.buffer.is_empty() && max_wait_secs > 0.0 {
            let timeout = Duration::try_from_secs_f64(max_wait_secs).unwrap_or(Duration::MAX);
            inner = self
                .shared
                .cond
                .wait_timeout_while(inner, timeout, |i| i.buffer.is_empty())
                .map_err(|_| Error::ThreadError("queue mutex poisoned".into()))?
                .0;
        }
        Ok(inner.buffer.pop())
    }

    /// Number of unread buffered events.
    pub fn available(&self) -> Result<usize> {
        Ok(self.lock_inner()?.buffer.len())
    }

    /// Most recent buffered event for an element code, without consuming
    /// anything. Used to coalesce touch points.
    pub fn latest_event_for(&self, code: u16) -> Result<Option<KeyEvent>> {
        Ok(self.lock_inner()?.buffer.last_matching(code).cloned())
    }

    /// Events lost to the drop-oldest policy since the last start.
    pub fn dropped(&self) -> Result<u64> {
        Ok(self.lock_inner()?.dropped)
    }

    fn lock_inner(&self) -> Result<MutexGuard<'_, Inner>> {
        self.shared
            .inner
            .lock()
            .map_err(|_| Error::ThreadError("queue mutex poisoned".into()))
    }

    fn lock_worker(&self) -> Result<MutexGuard<'_, WorkerSlot>> {
        self.worker
            .lock()
            .map_err(|_| Error::ThreadError("worker mutex poisoned".into()))
    }

    fn join_worker(slot: &mut WorkerSlot) -> Result<()> {
        slot.running.store(false, Ordering::SeqCst);
        if let Some(handle) = slot.handle.take() {
            handle
                .join()
                .map_err(|_| Error::ThreadError("failed to join capture worker".into()))?;
        }
        Ok(())
    }
}

impl Drop for Queue {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.worker.lock() {
            let _ = Self::join_worker(&mut slot);
        }
    }
}

impl std::fmt::Debug for Queue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Queue")
            .field("device", &self.caps.index)
            .field("slots", &self.slots)
            .field("phase", &self.phase())
            .finish()
    }
}

struct WorkerCtx {
    shared: Arc<Shared>,
    running: Arc<AtomicBool>,
    filter: ScanFilter,
    is_keyboard: bool,
    num_valuators: usize,
    interrupt: Option<Arc<dyn InterruptSink>>,
    index: u32,
}

/// Body of the capture worker thread. Runs until the stop flag clears or
/// the source fails; either way the source is closed on the way out.
fn capture_loop(mut source: Box<dyn CaptureSource>, ctx: WorkerCtx) {
    while ctx.running.load(Ordering::SeqCst) {
        match source.next_transition(SOURCE_WAIT) {
            Ok(Some(transition)) => publish(&ctx, transition),
            Ok(None) => {}
            Err(e) => {
                log::warn!("device {}: capture source failed: {e}", ctx.index);
                let mut inner = ctx.shared.inner.lock().expect("queue mutex poisoned");
                inner.phase = QueuePhase::Stopped;
                inner.capture_failed = Some(e.to_string());
                break;
            }
        }
    }
    source.close();
}

/// Normalize one raw transition and publish it into the shared state.
fn publish(ctx: &WorkerCtx, transition: RawTransition) {
    if !ctx.filter.accepts(transition.code) {
        return;
    }

    let RawTransition { time, code, kind } = transition;
    let is_press = matches!(kind, TransitionKind::Press);
    let mut fire_interrupt = false;

    {
        let mut inner = ctx.shared.inner.lock().expect("queue mutex poisoned");
        let event = match kind {
            TransitionKind::Press | TransitionKind::Release => {
                let pressed = is_press;
                let mut cooked = COOKED_NONE;
                if ctx.is_keyboard {
                    inner.modifiers.apply(code, pressed);
                    fire_interrupt =
                        keymap::is_interrupt_combo(code, pressed, &inner.modifiers);
                    cooked = keymap::cook(code, &inner.modifiers);
                }
                if (code as usize) < NUM_KEYS {
                    inner.table.record(code, pressed, time);
                    inner.key_state[code as usize] = pressed;
                }
                KeyEvent::key(time, code, pressed).with_cooked(cooked)
            }
            TransitionKind::Sample {
                mut valuators,
                position,
            } => {
                valuators.truncate(ctx.num_valuators);
                let pressed =
                    (code as usize) < NUM_KEYS && inner.key_state[code as usize];
                let mut event = KeyEvent::sample(time, code, valuators);
                event.pressed = pressed;
                if let Some(position) = position {
                    event = event.with_position(position);
                }
                event
            }
        };

        if inner.buffer.push(event).is_some() {
            inner.dropped += 1;
            log::trace!("device {}: buffer full, dropped oldest event", ctx.index);
        }
        ctx.shared.cond.notify_one();
    }

    if fire_interrupt {
        if let Some(sink) = &ctx.interrupt {
            log::debug!("device {}: console interrupt combination", ctx.index);
            sink.notify();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::StaticProvider;
    use crate::source::SyntheticInjector;
    use std::sync::atomic::AtomicUsize;
    use std::time::Instant;

    fn caps(index: u32, is_keyboard: bool) -> DeviceCaps {
        DeviceCaps {
            index,
            name: format!("synthetic-{index}"),
            is_keyboard,
            num_valuators: 4,
        }
    }

    fn keyboard_setup(slots: usize, filter: ScanFilter) -> (Queue, StaticProvider, SyntheticInjector) {
        let injector = SyntheticInjector::new();
        let source_state = injector.clone();
        let provider = StaticProvider::new()
            .with_device(caps(0, true), move || Ok(Box::new(source_state.source())));
        let queue = Queue::new(caps(0, true), filter, 4, slots, None);
        (queue, provider, injector)
    }

    fn wait_until(what: &str, mut predicate: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !predicate() {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    #[test]
    fn test_check_reports_first_press_times() {
        let (queue, provider, injector) = keyboard_setup(16, ScanFilter::all());
        injector.press(5, 1.000);
        injector.press(9, 1.002);
        queue.start(&provider).unwrap();

        wait_until("both presses buffered", || queue.available().unwrap() == 2);

        let report = queue.check().unwrap();
        assert!(report.any_pressed);
        assert_eq!(report.first_press[5], 1.000);
        assert_eq!(report.first_press[9], 1.002);
        assert_eq!(report.last_press[5], 1.000);
        assert!(report.first_release.iter().all(|&t| t == 0.0));
        assert!(report.last_release.iter().all(|&t| t == 0.0));

        // Consume-on-read: an immediate second check reports nothing.
        let again = queue.check().unwrap();
        assert!(!again.any_pressed);
        assert_eq!(again.first_press[5], 0.0);
        assert_eq!(again.first_press[9], 0.0);
    }

    #[test]
    fn test_drop_oldest_keeps_most_recent() {
        let (queue, provider, injector) = keyboard_setup(16, ScanFilter::all());
        queue.start(&provider).unwrap();

        for n in 1..=20u16 {
            injector.press(n, n as f64);
        }
        // A sentinel press marks the end of the burst; once it is visible
        // every earlier transition has been published too.
        injector.press(99, 21.0);
        wait_until("sentinel buffered", || {
            queue.latest_event_for(99).unwrap().is_some()
        });

        assert_eq!(queue.available().unwrap(), 16);
        let mut codes = Vec::new();
        while let Some(event) = queue.get_event(0.0).unwrap() {
            codes.push(event.code);
        }
        let mut expected: Vec<u16> = (6..=20).collect();
        expected.push(99);
        assert_eq!(codes, expected);
        assert_eq!(queue.dropped().unwrap(), 5);
    }

    #[test]
    fn test_flush_is_idempotent() {
        let (queue, provider, injector) = keyboard_setup(8, ScanFilter::all());
        queue.start(&provider).unwrap();
        injector.press(3, 0.5);
        injector.release(3, 0.6);
        wait_until("events buffered", || queue.available().unwrap() == 2);

        assert_eq!(queue.flush().unwrap(), 2);
        assert_eq!(queue.flush().unwrap(), 0);
        assert!(!queue.check().unwrap().any_pressed);
        assert!(queue.get_event(0.0).unwrap().is_none());
    }

    #[test]
    fn test_stop_then_start_clears_accumulated_state() {
        let (queue, provider, injector) = keyboard_setup(8, ScanFilter::all());
        queue.start(&provider).unwrap();
        injector.press(7, 1.0);
        wait_until("press buffered", || queue.available().unwrap() == 1);

        queue.stop().unwrap();
        assert_eq!(queue.phase(), QueuePhase::Stopped);
        queue.start(&provider).unwrap();

        assert_eq!(queue.available().unwrap(), 0);
        assert!(!queue.check().unwrap().any_pressed);
    }

    #[test]
    fn test_stop_retains_buffered_events() {
        let (queue, provider, injector) = keyboard_setup(8, ScanFilter::all());
        queue.start(&provider).unwrap();
        injector.press(12, 2.0);
        wait_until("press buffered", || queue.available().unwrap() == 1);

        queue.stop().unwrap();
        // Stopping is a no-op when already stopped.
        queue.stop().unwrap();

        let event = queue.get_event(0.0).unwrap().expect("event retained");
        assert_eq!(event.code, 12);
        assert_eq!(queue.check().unwrap().first_press[12], 2.0);
    }

    #[test]
    fn test_start_is_idempotent_while_running() {
        let (queue, provider, _injector) = keyboard_setup(8, ScanFilter::all());
        queue.start(&provider).unwrap();
        queue.start(&provider).unwrap();
        assert_eq!(queue.phase(), QueuePhase::Running);
        queue.stop().unwrap();
    }

    #[test]
    fn test_get_event_wakes_on_arrival() {
        let (queue, provider, injector) = keyboard_setup(8, ScanFilter::all());
        queue.start(&provider).unwrap();

        let remote = injector.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            remote.press(42, 1.0);
        });

        let started = Instant::now();
        let event = queue.get_event(2.0).unwrap().expect("event should arrive");
        assert_eq!(event.code, 42);
        assert!(started.elapsed() < Duration::from_secs(2));
        handle.join().unwrap();
    }

    #[test]
    fn test_get_event_times_out_empty() {
        let (queue, provider, _injector) = keyboard_setup(8, ScanFilter::all());
        queue.start(&provider).unwrap();

        let started = Instant::now();
        assert!(queue.get_event(0.05).unwrap().is_none());
        assert!(started.elapsed() >= Duration::from_millis(40));

        // Non-positive wait polls without blocking.
        assert!(queue.get_event(0.0).unwrap().is_none());
    }

    #[test]
    fn test_scan_filter_excludes_codes() {
        let (queue, provider, injector) = keyboard_setup(8, ScanFilter::only(&[5]));
        queue.start(&provider).unwrap();

        injector.press(6, 1.0);
        injector.press(5, 1.1);
        wait_until("accepted press buffered", || queue.available().unwrap() == 1);

        let event = queue.get_event(0.0).unwrap().unwrap();
        assert_eq!(event.code, 5);
        let report = queue.check().unwrap();
        assert_eq!(report.first_press[6], 0.0);
        assert_eq!(report.first_press[5], 1.1);
    }

    #[test]
    fn test_start_fails_when_source_unavailable() {
        let provider = StaticProvider::new().with_device(caps(0, true), || {
            Err(Error::CaptureUnavailable("device unplugged".into()))
        });
        let queue = Queue::new(caps(0, true), ScanFilter::all(), 0, 8, None);

        assert!(matches!(
            queue.start(&provider),
            Err(Error::CaptureUnavailable(_))
        ));
        assert_eq!(queue.phase(), QueuePhase::Created);
    }

    struct FailingSource;

    impl CaptureSource for FailingSource {
        fn next_transition(&mut self, _timeout: Duration) -> Result<Option<RawTransition>> {
            Err(Error::CaptureUnavailable("source died".into()))
        }
    }

    #[test]
    fn test_worker_failure_surfaces_on_next_start() {
        let provider =
            StaticProvider::new().with_device(caps(0, true), || Ok(Box::new(FailingSource)));
        let queue = Queue::new(caps(0, true), ScanFilter::all(), 0, 8, None);

        queue.start(&provider).unwrap();
        wait_until("worker self-stop", || queue.phase() == QueuePhase::Stopped);

        // The failure is reported once, then start retries the open.
        assert!(matches!(
            queue.start(&provider),
            Err(Error::CaptureUnavailable(_))
        ));
        queue.start(&provider).unwrap();
        queue.stop().unwrap();
    }

    #[test]
    fn test_interrupt_combo_notifies_sink() {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        let injector = SyntheticInjector::new();
        let source_state = injector.clone();
        let provider = StaticProvider::new()
            .with_device(caps(0, true), move || Ok(Box::new(source_state.source())));
        let queue = Queue::new(
            caps(0, true),
            ScanFilter::all(),
            0,
            8,
            Some(Arc::new(move || {
                sink.fetch_add(1, Ordering::SeqCst);
            })),
        );
        queue.start(&provider).unwrap();

        injector.press(29, 1.0); // left ctrl
        injector.press(keymap::INTERRUPT_CODE, 1.1);
        injector.release(keymap::INTERRUPT_CODE, 1.2);
        injector.release(29, 1.3);
        wait_until("combo processed", || queue.available().unwrap() == 4);

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_keyboard_events_carry_cooked_codes() {
        let (queue, provider, injector) = keyboard_setup(8, ScanFilter::all());
        queue.start(&provider).unwrap();

        injector.press(42, 0.9); // left shift
        injector.press(30, 1.0); // 'a' with shift held
        wait_until("events buffered", || queue.available().unwrap() == 2);

        let shift = queue.get_event(0.0).unwrap().unwrap();
        assert_eq!(shift.cooked, crate::event::COOKED_UNMAPPED);
        let a = queue.get_event(0.0).unwrap().unwrap();
        assert_eq!(a.cooked, 'A' as i32);
    }

    #[test]
    fn test_valuator_samples_skip_the_table() {
        let injector = SyntheticInjector::new();
        let source_state = injector.clone();
        let provider = StaticProvider::new()
            .with_device(caps(0, false), move || Ok(Box::new(source_state.source())));
        let queue = Queue::new(caps(0, false), ScanFilter::all(), 2, 8, None);
        queue.start(&provider).unwrap();

        injector.sample(300, 1.0, vec![0.5, 0.7, 0.9]);
        wait_until("sample buffered", || queue.available().unwrap() == 1);

        assert!(!queue.check().unwrap().any_pressed);
        let event = queue.latest_event_for(300).unwrap().unwrap();
        // Truncated to the requested valuator count.
        assert_eq!(event.valuators, vec![0.5, 0.7]);
        assert_eq!(event.cooked, COOKED_NONE);
        assert!(!event.pressed);
        // The coalescing scan left the event in place.
        assert_eq!(queue.available().unwrap(), 1);
    }
}
