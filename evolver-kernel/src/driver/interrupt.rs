//! Cooperative cancellation for in-flight commands.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Notify;

#[derive(Debug, Default)]
struct Inner {
    requested: AtomicBool,
    notify: Notify,
}

/// Cloneable handle used to ask the coordinator to interrupt the command it
/// is currently waiting on.
///
/// An interrupt reaches Evolver as Ctrl-C; the session itself survives.
///
/// ```rust
/// use evolver_kernel::InterruptHandle;
///
/// let handle = InterruptHandle::new();
/// let remote = handle.clone();
/// remote.interrupt();
/// assert!(handle.is_requested());
/// ```
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    inner: Arc<Inner>,
}

impl InterruptHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request an interrupt.
    pub fn interrupt(&self) {
        self.inner.requested.store(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
    }

    /// Whether an interrupt is pending.
    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Drop any pending request.
    pub fn clear(&self) {
        self.inner.requested.store(false, Ordering::SeqCst);
    }

    /// Resolve once an interrupt is requested, consuming the request.
    pub async fn requested(&self) {
        loop {
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            // Register before checking the flag so a concurrent
            // `interrupt()` cannot slip between the two
            notified.as_mut().enable();
            if self.inner.requested.swap(false, Ordering::SeqCst) {
                return;
            }
            notified.await;
        }
    }
}
