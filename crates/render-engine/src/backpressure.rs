//! Counting semaphore bounding frames in flight.
//!
//! The dispatcher takes a [`SlotPermit`] before handing a frame to a render
//! worker. The permit travels with the frame and is released when the frame
//! is dropped: after the writer appended it, or when it is discarded on
//! cancellation or failure. Every acquired permit is released exactly once.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use reel_common::error::{ExportError, ExportResult};

use crate::cancel::{CancelToken, CancelWaker};

struct SlotsInner {
    available: Mutex<usize>,
    freed: Condvar,
    capacity: usize,
    acquired: AtomicU64,
    released: AtomicU64,
    peak_in_flight: AtomicUsize,
}

impl SlotsInner {
    fn lock(&self) -> MutexGuard<'_, usize> {
        self.available.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn release(&self) {
        let mut available = self.lock();
        *available += 1;
        self.released.fetch_add(1, Ordering::SeqCst);
        self.freed.notify_one();
    }
}

impl CancelWaker for SlotsInner {
    fn wake(&self) {
        let _available = self.lock();
        self.freed.notify_all();
    }
}

/// `max_in_flight` slots shared by the dispatcher and the writer.
#[derive(Clone)]
pub struct FrameSlots {
    inner: Arc<SlotsInner>,
}

impl FrameSlots {
    pub fn new(capacity: usize) -> ExportResult<Self> {
        if capacity == 0 {
            return Err(ExportError::invalid("in-flight frame limit must be positive"));
        }
        Ok(Self {
            inner: Arc::new(SlotsInner {
                available: Mutex::new(capacity),
                freed: Condvar::new(),
                capacity,
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }),
        })
    }

    /// Wait for a free slot; `Cancelled` if `cancel` fires first.
    pub fn acquire(&self, cancel: &CancelToken) -> ExportResult<SlotPermit> {
        let mut available = self.inner.lock();
        let mut registered = false;
        loop {
            cancel.check()?;
            if *available > 0 {
                *available -= 1;
                let in_flight = self.inner.capacity - *available;
                self.inner.acquired.fetch_add(1, Ordering::SeqCst);
                self.inner
                    .peak_in_flight
                    .fetch_max(in_flight, Ordering::SeqCst);
                return Ok(SlotPermit {
                    slots: self.inner.clone(),
                });
            }
            if !registered {
                drop(available);
                cancel.register(&self.inner);
                registered = true;
                available = self.inner.lock();
                continue;
            }
            available = self
                .inner
                .freed
                .wait(available)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn in_flight(&self) -> usize {
        self.inner.capacity - *self.inner.lock()
    }

    pub fn acquired_count(&self) -> u64 {
        self.inner.acquired.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> u64 {
        self.inner.released.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }
}

/// One occupied slot; released on drop.
pub struct SlotPermit {
    slots: Arc<SlotsInner>,
}

impl Drop for SlotPermit {
    fn drop(&mut self) {
        self.slots.release();
    }
}

impl std::fmt::Debug for SlotPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SlotPermit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_permits_balance() {
        let slots = FrameSlots::new(3).unwrap();
        let cancel = CancelToken::new();
        let permits: Vec<SlotPermit> = (0..3).map(|_| slots.acquire(&cancel).unwrap()).collect();
        assert_eq!(slots.in_flight(), 3);
        drop(permits);
        assert_eq!(slots.in_flight(), 0);
        assert_eq!(slots.acquired_count(), 3);
        assert_eq!(slots.released_count(), 3);
        assert_eq!(slots.peak_in_flight(), 3);
    }

    #[test]
    fn test_full_slots_block_until_release() {
        let slots = FrameSlots::new(1).unwrap();
        let cancel = CancelToken::new();
        let first = slots.acquire(&cancel).unwrap();
        let waiter = {
            let slots = slots.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || slots.acquire(&cancel).map(drop))
        };
        std::thread::sleep(Duration::from_millis(10));
        drop(first);
        assert!(waiter.join().unwrap().is_ok());
        assert_eq!(slots.acquired_count(), slots.released_count());
    }

    #[test]
    fn test_cancel_unblocks_waiter() {
        let slots = FrameSlots::new(1).unwrap();
        let cancel = CancelToken::new();
        let _held = slots.acquire(&cancel).unwrap();
        let waiter = {
            let slots = slots.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || slots.acquire(&cancel).map(drop))
        };
        cancel.cancel();
        assert!(matches!(waiter.join().unwrap(), Err(ExportError::Cancelled)));
        assert_eq!(slots.acquired_count(), 1);
    }
}
