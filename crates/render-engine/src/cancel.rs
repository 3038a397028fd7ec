//! Cooperative cancellation.
//!
//! Blocking waits register a [`CancelWaker`] so a cancel wakes them
//! directly instead of being noticed on the next timeout.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use reel_common::error::{ExportError, ExportResult};

/// Something blocked that must re-check the token when it fires.
///
/// Implementations take the lock their waiters sleep under before
/// notifying, so a wake-up cannot slip in between a waiter's check and
/// its wait.
pub trait CancelWaker: Send + Sync {
    fn wake(&self);
}

#[derive(Default)]
struct TokenInner {
    flag: AtomicBool,
    wakers: Mutex<Vec<Weak<dyn CancelWaker>>>,
}

impl TokenInner {
    fn fire(&self) {
        if self.flag.swap(true, Ordering::SeqCst) {
            return;
        }
        let wakers = std::mem::take(&mut *self.wakers.lock().unwrap_or_else(|e| e.into_inner()));
        for waker in wakers.iter().filter_map(Weak::upgrade) {
            waker.wake();
        }
    }
}

// A child token is itself a waker on its parent.
impl CancelWaker for TokenInner {
    fn wake(&self) {
        self.fire();
    }
}

/// A cloneable flag checked at loop boundaries.
///
/// A child token observes its parent's cancellation but can also be
/// cancelled on its own without affecting the parent.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<TokenInner>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.inner.fire();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> ExportResult<()> {
        if self.is_cancelled() {
            Err(ExportError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn child(&self) -> CancelToken {
        let child = CancelToken::new();
        self.register(&child.inner);
        child
    }

    /// Wake `waker` when this token fires; immediately if it already has.
    ///
    /// Only a weak reference is kept. Registering the same waker twice is
    /// a no-op.
    pub fn register<W: CancelWaker + 'static>(&self, waker: &Arc<W>) {
        let weak: Weak<dyn CancelWaker> = Arc::downgrade(waker) as Weak<dyn CancelWaker>;
        {
            let mut wakers = self.inner.wakers.lock().unwrap_or_else(|e| e.into_inner());
            if !self.is_cancelled() {
                wakers.retain(|w| w.strong_count() > 0);
                if !wakers.iter().any(|w| w.ptr_eq(&weak)) {
                    wakers.push(weak);
                }
                return;
            }
        }
        waker.wake();
    }
}
