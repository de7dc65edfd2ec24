//! Completion barrier: a counting handshake for one dispatch wave
//!
//! Tracks jobs-posted versus jobs-done for a batch of dispatches. The
//! posted count is bumped by the pool while it posts jobs (under the pool
//! mutex, so it is kept atomic here); the done count is bumped by workers
//! under the barrier's own mutex. The two lock domains never nest.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// Shared barrier state; jobs hold an `Arc` to it while in flight.
pub(crate) struct BarrierInner {
    /// Jobs posted against this barrier since the last `start`
    posted: AtomicUsize,
    /// Jobs finished; guarded by its own mutex, signaled on `cond`
    done: Mutex<usize>,
    cond: Condvar,
}

impl BarrierInner {
    pub(crate) fn new() -> Self {
        Self {
            posted: AtomicUsize::new(0),
            done: Mutex::new(0),
            cond: Condvar::new(),
        }
    }

    /// Called by the pool while posting a job, under the pool mutex.
    pub(crate) fn add_posted(&self) {
        self.posted.fetch_add(1, Ordering::AcqRel);
    }

    /// Called by a worker after the job (and its cleanup) completed.
    pub(crate) fn signal_done(&self) {
        if let Ok(mut done) = self.done.lock() {
            *done += 1;
            self.cond.notify_all();
        }
    }

    pub(crate) fn posted_count(&self) -> usize {
        self.posted.load(Ordering::Acquire)
    }
}

/// Handle for waiting on the completion of a batch of jobs.
///
/// Lifecycle: [`new`](Barrier::new) → [`start`](Barrier::start) → attach to
/// dispatch calls → [`wait`](Barrier::wait) (or [`end`](Barrier::end)).
/// A barrier attached to zero jobs returns from `wait` immediately.
///
/// `wait` must only be called after every dispatch for the wave has been
/// issued; there is no sealing operation. Reusing a barrier for a new wave
/// requires an intervening `start`, and overlapping waves on one barrier
/// are a caller error.
///
/// Handles are cheap to clone; clones observe the same wave.
#[derive(Clone)]
pub struct Barrier {
    inner: Arc<BarrierInner>,
}

impl Barrier {
    /// Create a barrier with zeroed counters.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BarrierInner::new()),
        }
    }

    /// Reset both counters, making the barrier eligible for a new wave.
    pub fn start(&self) {
        if let Ok(mut done) = self.inner.done.lock() {
            *done = 0;
        }
        self.inner.posted.store(0, Ordering::Release);
    }

    /// Block until every job posted against this barrier has finished.
    ///
    /// Returns immediately if no jobs were posted. On a poisoned lock the
    /// wait is abandoned (the environment fault made its contract
    /// unmeetable).
    pub fn wait(&self) {
        let Ok(mut done) = self.inner.done.lock() else {
            return;
        };
        while *done < self.inner.posted.load(Ordering::Acquire) {
            done = match self.inner.cond.wait(done) {
                Ok(guard) => guard,
                Err(_) => return,
            };
        }
    }

    /// Wait for the wave, then release this handle.
    pub fn end(self) {
        self.wait();
    }

    pub(crate) fn inner(&self) -> Arc<BarrierInner> {
        self.inner.clone()
    }
}

impl Default for Barrier {
    fn default() -> Self {
        Self::new()
    }
}
