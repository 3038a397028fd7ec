//! Bounded pool of output frame buffers.
//!
//! Buffers are allocated on first demand up to the pool capacity, handed out
//! as [`PooledBuffer`] guards and returned when the guard drops. Peak memory
//! is bounded by the capacity, and a short export only pays for the frames
//! it actually has in flight.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

use reel_common::error::{ExportError, ExportResult};

use crate::cancel::{CancelToken, CancelWaker};
use crate::frame::PixelBuffer;

#[derive(Default)]
struct FreeList {
    buffers: Vec<PixelBuffer>,
    /// Buffers created so far, free or on loan.
    allocated: usize,
}

struct PoolInner {
    free: Mutex<FreeList>,
    available: Condvar,
    capacity: usize,
    width: u32,
    height: u32,
    acquired: AtomicU64,
    released: AtomicU64,
}

impl PoolInner {
    fn lock_free(&self) -> MutexGuard<'_, FreeList> {
        self.free.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Pop a free buffer or reserve room for a new one.
    fn take(&self, free: &mut FreeList) -> Option<Option<PixelBuffer>> {
        if let Some(buffer) = free.buffers.pop() {
            return Some(Some(buffer));
        }
        if free.allocated < self.capacity {
            free.allocated += 1;
            return Some(None);
        }
        None
    }

    /// Turn a reservation from [`take`](Self::take) into a loan.
    fn lend(self: &Arc<Self>, reserved: Option<PixelBuffer>) -> ExportResult<PooledBuffer> {
        let buffer = match reserved {
            Some(buffer) => buffer,
            None => match PixelBuffer::try_new(self.width, self.height) {
                Ok(buffer) => buffer,
                Err(err) => {
                    self.lock_free().allocated -= 1;
                    self.available.notify_one();
                    return Err(err);
                }
            },
        };
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(PooledBuffer {
            buffer,
            pool: self.clone(),
        })
    }
}

impl CancelWaker for PoolInner {
    fn wake(&self) {
        let _free = self.lock_free();
        self.available.notify_all();
    }
}

/// Thread-safe pool of equally sized [`PixelBuffer`]s.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    /// A pool of at most `capacity` buffers of `width` x `height`.
    pub fn new(capacity: usize, width: u32, height: u32) -> ExportResult<Self> {
        if capacity == 0 {
            return Err(ExportError::invalid("buffer pool capacity must be positive"));
        }
        let frame_bytes = PixelBuffer::bytes_for(width, height);
        let mut buffers = Vec::new();
        buffers
            .try_reserve_exact(capacity)
            .map_err(|e| ExportError::exhausted(format!("buffer pool: {e}")))?;
        tracing::debug!(
            capacity,
            width,
            height,
            max_bytes = capacity.saturating_mul(frame_bytes),
            "Created frame buffer pool"
        );
        Ok(Self {
            inner: Arc::new(PoolInner {
                free: Mutex::new(FreeList {
                    buffers,
                    allocated: 0,
                }),
                available: Condvar::new(),
                capacity,
                width,
                height,
                acquired: AtomicU64::new(0),
                released: AtomicU64::new(0),
            }),
        })
    }

    /// Take a buffer, blocking while all `capacity` buffers are on loan.
    ///
    /// Returns `Cancelled` if `cancel` fires while waiting.
    pub fn acquire(&self, cancel: &CancelToken) -> ExportResult<PooledBuffer> {
        let mut free = self.inner.lock_free();
        let mut registered = false;
        loop {
            cancel.check()?;
            if let Some(reserved) = self.inner.take(&mut free) {
                drop(free);
                return self.inner.lend(reserved);
            }
            if !registered {
                drop(free);
                cancel.register(&self.inner);
                registered = true;
                free = self.inner.lock_free();
                continue;
            }
            free = self
                .inner
                .available
                .wait(free)
                .unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Non-blocking variant of [`BufferPool::acquire`].
    pub fn try_acquire(&self) -> Option<PooledBuffer> {
        let reserved = self.inner.take(&mut self.inner.lock_free())?;
        self.inner.lend(reserved).ok()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Buffers that can be taken without blocking.
    pub fn available(&self) -> usize {
        let free = self.inner.lock_free();
        free.buffers.len() + (self.inner.capacity - free.allocated)
    }

    /// Buffers created so far.
    pub fn allocated(&self) -> usize {
        self.inner.lock_free().allocated
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.inner.width, self.inner.height)
    }

    pub fn acquired_count(&self) -> u64 {
        self.inner.acquired.load(Ordering::SeqCst)
    }

    pub fn released_count(&self) -> u64 {
        self.inner.released.load(Ordering::SeqCst)
    }
}

/// A buffer on loan from a [`BufferPool`]; returns itself on drop.
pub struct PooledBuffer {
    buffer: PixelBuffer,
    pool: Arc<PoolInner>,
}

impl Deref for PooledBuffer {
    type Target = PixelBuffer;

    fn deref(&self) -> &PixelBuffer {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buffer = std::mem::replace(&mut self.buffer, PixelBuffer::new(0, 0));
        self.pool.lock_free().buffers.push(buffer);
        self.pool.released.fetch_add(1, Ordering::SeqCst);
        self.pool.available.notify_one();
    }
}

impl std::fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PooledBuffer").field(&self.buffer).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_acquire_and_return() {
        let pool = BufferPool::new(2, 4, 4).unwrap();
        let cancel = CancelToken::new();
        let a = pool.acquire(&cancel).unwrap();
        let b = pool.acquire(&cancel).unwrap();
        assert_eq!(pool.available(), 0);
        assert!(pool.try_acquire().is_none());
        drop(a);
        assert_eq!(pool.available(), 1);
        drop(b);
        assert_eq!(pool.acquired_count(), 2);
        assert_eq!(pool.released_count(), 2);
    }

    #[test]
    fn test_blocked_acquire_observes_cancel() {
        let pool = BufferPool::new(1, 2, 2).unwrap();
        let cancel = CancelToken::new();
        let held = pool.acquire(&cancel).unwrap();

        let waiter = {
            let pool = pool.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || pool.acquire(&cancel).map(|_| ()))
        };
        std::thread::sleep(Duration::from_millis(30));
        cancel.cancel();
        let result = waiter.join().unwrap();
        assert!(matches!(result, Err(ExportError::Cancelled)));
        drop(held);
    }

    #[test]
    fn test_blocked_acquire_wakes_on_release() {
        let pool = BufferPool::new(1, 2, 2).unwrap();
        let cancel = CancelToken::new();
        let held = pool.acquire(&cancel).unwrap();
        let waiter = {
            let pool = pool.clone();
            let cancel = cancel.clone();
            std::thread::spawn(move || pool.acquire(&cancel).map(|b| b.width()))
        };
        std::thread::sleep(Duration::from_millis(10));
        drop(held);
        assert_eq!(waiter.join().unwrap().unwrap(), 2);
    }

    #[test]
    fn test_buffers_are_allocated_on_demand() {
        let pool = BufferPool::new(64, 1920, 1080).unwrap();
        let cancel = CancelToken::new();
        assert_eq!(pool.allocated(), 0);
        assert_eq!(pool.available(), 64);

        let a = pool.acquire(&cancel).unwrap();
        drop(a);
        let b = pool.acquire(&cancel).unwrap();
        // The returned buffer is reused rather than a second one created.
        assert_eq!(pool.allocated(), 1);
        assert_eq!((b.width(), b.height()), (1920, 1080));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(BufferPool::new(0, 2, 2).is_err());
    }
}
