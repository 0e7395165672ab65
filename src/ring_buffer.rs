//! Lock-free single-producer single-consumer byte ring buffer (C1).
//!
//! One producer and one consumer, each on their own thread, may operate on
//! the same `RingBuffer` concurrently without locking. The producer calls
//! `write_slice`/`advance_write`; the consumer calls `read_slice`/
//! `advance_read`. Capacity is rounded up to the next power of two so the
//! read/write indices can wrap with a mask instead of a modulo.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A lock-free SPSC byte ring.
///
/// Safety of concurrent access relies on there being exactly one producer
/// and exactly one consumer, matching the single edge between exactly two
/// ports that every ring in the pipeline is created for.
pub struct RingBuffer {
    buf: UnsafeCell<Box<[u8]>>,
    mask: usize,
    write_index: AtomicUsize,
    read_index: AtomicUsize,
}

// SAFETY: `buf` is only ever read by the consumer in the byte range it has
// observed as readable, and only ever written by the producer in the byte
// range it has observed as writable. Those ranges never overlap because of
// the acquire/release handoff on `write_index`/`read_index`.
unsafe impl Sync for RingBuffer {}
unsafe impl Send for RingBuffer {}

impl RingBuffer {
    /// Creates a ring buffer able to hold at least `capacity` bytes.
    #[inline]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1).next_power_of_two();
        Self {
            buf: UnsafeCell::new(vec![0u8; capacity].into_boxed_slice()),
            mask: capacity - 1,
            write_index: AtomicUsize::new(0),
            read_index: AtomicUsize::new(0),
        }
    }

    /// Total capacity in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Bytes currently occupied and available to the consumer.
    #[inline]
    pub fn readable_bytes(&self) -> usize {
        let w = self.write_index.load(Ordering::Acquire);
        let r = self.read_index.load(Ordering::Relaxed);
        w.wrapping_sub(r)
    }

    /// Bytes currently free and available to the producer.
    #[inline]
    pub fn writable_bytes(&self) -> usize {
        self.capacity() - self.readable_bytes()
    }

    /// Producer-side: copies `data` into the ring and advances the write
    /// index. Panics if `data.len()` exceeds `writable_bytes()`.
    pub fn write(&self, data: &[u8]) {
        let writable = self.writable_bytes();
        if data.len() > writable {
            panic!("bounds check: write of {} exceeds {writable} writable bytes", data.len());
        }
        let w = self.write_index.load(Ordering::Relaxed);
        let start = w & self.mask;
        // SAFETY: the producer is the sole writer and the byte range
        // [start, start+data.len()) was just verified free.
        let buf = unsafe { &mut *self.buf.get() };
        let first_len = (self.capacity() - start).min(data.len());
        buf[start..start + first_len].copy_from_slice(&data[..first_len]);
        if first_len < data.len() {
            buf[..data.len() - first_len].copy_from_slice(&data[first_len..]);
        }
        self.advance_write(data.len());
    }

    /// Consumer-side: copies up to `out.len()` bytes from the ring into
    /// `out`, returning the number of bytes copied, and advances the read
    /// index by that amount.
    pub fn read(&self, out: &mut [u8]) -> usize {
        let readable = self.readable_bytes();
        let n = out.len().min(readable);
        let r = self.read_index.load(Ordering::Relaxed);
        let start = r & self.mask;
        // SAFETY: the consumer is the sole reader and the byte range
        // [start, start+n) was just verified occupied.
        let buf = unsafe { &*self.buf.get() };
        let first_len = (self.capacity() - start).min(n);
        out[..first_len].copy_from_slice(&buf[start..start + first_len]);
        if first_len < n {
            out[first_len..n].copy_from_slice(&buf[..n - first_len]);
        }
        self.advance_read(n);
        n
    }

    /// Advances the write index by `n` bytes, publishing them to the
    /// consumer. Panics if `n` exceeds `writable_bytes()`.
    #[inline]
    pub fn advance_write(&self, n: usize) {
        if n > self.writable_bytes() {
            panic!("bounds check: advance_write({n}) exceeds writable bytes");
        }
        let w = self.write_index.load(Ordering::Relaxed);
        self.write_index.store(w.wrapping_add(n), Ordering::Release);
    }

    /// Advances the read index by `n` bytes, freeing them for the producer.
    /// Panics if `n` exceeds `readable_bytes()`.
    #[inline]
    pub fn advance_read(&self, n: usize) {
        if n > self.readable_bytes() {
            panic!("bounds check: advance_read({n}) exceeds readable bytes");
        }
        let r = self.read_index.load(Ordering::Relaxed);
        self.read_index.store(r.wrapping_add(n), Ordering::Release);
    }
}
