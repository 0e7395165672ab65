//! Bounded event queues for notes/param ports, and the hardware wakeup path (C8).

use std::sync::{Arc, Condvar, Mutex};

use crossbeam_channel::{Receiver, Sender, TrySendError};

/// A small, bounded MPSC queue of raw event payloads (MIDI-style bytes for
/// notes ports, a single f64 for param ports). Not performance-critical —
/// events are sparse compared to audio sample throughput.
#[derive(Clone)]
pub struct EventChannel {
    tx: Sender<Event>,
    rx: Receiver<Event>,
}

/// One timestamped event carried on a notes or param port.
#[derive(Debug, Clone, Copy)]
pub enum Event {
    /// A three-byte MIDI-style message (status, data1, data2).
    Midi([u8; 3]),
    /// A single parameter value.
    Param(f64),
}

/// Default depth for a port's event queue; generous relative to typical
/// per-block event counts so `push` practically never reports `Full`.
const EVENT_QUEUE_DEPTH: usize = 256;

impl EventChannel {
    pub fn new() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(EVENT_QUEUE_DEPTH);
        Self { tx, rx }
    }

    /// Non-blocking push; returns `false` if the queue is full (the
    /// producer should treat this the same as backpressure from a full
    /// audio ring: skip and retry next cycle).
    #[inline]
    pub fn push(&self, event: Event) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => false,
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Non-blocking pop of the next queued event, if any.
    #[inline]
    pub fn pop(&self) -> Option<Event> {
        self.rx.try_recv().ok()
    }

    /// Number of events currently queued.
    #[inline]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}

impl Default for EventChannel {
    fn default() -> Self {
        Self::new()
    }
}

/// The condition variable bridging hardware callbacks (devices-changed,
/// MIDI/audio events-signal) to the control thread's `wait_events`.
///
/// Mirrors the devices/events condvar pair an engine like this keeps
/// alongside its task-scheduling condvar: hardware callbacks never block,
/// they just flip the flag and notify.
#[derive(Clone)]
pub struct EventWakeup {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl EventWakeup {
    pub fn new() -> Self {
        Self {
            inner: Arc::new((Mutex::new(false), Condvar::new())),
        }
    }

    /// Called from a hardware callback thread. Takes the mutex, sets the
    /// pending flag, signals, and releases — never blocks.
    pub fn wakeup(&self) {
        let (lock, cvar) = &*self.inner;
        let mut pending = lock.lock().unwrap();
        *pending = true;
        cvar.notify_all();
    }

    /// Blocks the calling thread until a `wakeup()` has been observed since
    /// the last call to `wait` or `flush`, then clears the pending flag.
    pub fn wait(&self) {
        let (lock, cvar) = &*self.inner;
        let mut pending = lock.lock().unwrap();
        while !*pending {
            pending = cvar.wait(pending).unwrap();
        }
        *pending = false;
    }

    /// Drains any already-pending wakeup without blocking, then waits for
    /// the next one. Used by `flush_events`, which must not miss a wakeup
    /// that raced with the flush.
    pub fn flush_then_wait(&self) {
        let (lock, cvar) = &*self.inner;
        let mut pending = lock.lock().unwrap();
        *pending = false;
        while !*pending {
            pending = cvar.wait(pending).unwrap();
        }
        *pending = false;
    }
}

impl Default for EventWakeup {
    fn default() -> Self {
        Self::new()
    }
}
