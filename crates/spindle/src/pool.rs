//! Worker pool: dispatch, the worker loop, and both shutdown protocols
//!
//! One mutex guards the queue and the live-worker count. Two condition
//! variables implement the producer/consumer protocol: `job_posted`
//! ("a job is available") wakes sleeping workers, `job_taken` ("a worker
//! took a job or exited") unblocks backpressured dispatchers and the
//! graceful destroyer. Job bodies run with no pool lock held, so jobs may
//! dispatch further work into this or another pool.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};

use crate::barrier::Barrier;
use crate::config::{PoolConfig, MAX_POOL_SIZE};
use crate::error::{PoolError, PoolResult};
use crate::queue::{CleanupFn, Job, JobFn, JobKind, JobQueue};
use crate::{sp_debug, sp_info, sp_warn};

/// Pool state guarded by the single pool mutex
struct PoolState {
    queue: JobQueue,
    /// Workers that have not yet exited during shutdown
    live: usize,
}

struct Shared {
    state: Mutex<PoolState>,
    /// Dispatcher: "there's a job!"
    job_posted: Condvar,
    /// A worker: "got it!" (or: "exited")
    job_taken: Condvar,
    /// Cooperative stop request set by `shutdown_now`
    cancelled: AtomicBool,
}

/// A fixed-size pool of long-lived worker threads.
///
/// Jobs are closures executed on the next free worker, in FIFO dispatch
/// order, optionally tagged with a [`Barrier`] and paired with a cleanup
/// handler that runs after the job body on every exit path the runtime can
/// intercept (normal return and panic).
///
/// Dropping the pool performs a graceful [`shutdown`](Pool::shutdown).
pub struct Pool {
    shared: Arc<Shared>,
    handles: Vec<JoinHandle<()>>,
    size: usize,
}

/// Per-worker view handed to [`Pool::for_each_thread`] callbacks.
pub struct WorkerRef<'a> {
    index: usize,
    thread: &'a thread::Thread,
    #[cfg(unix)]
    native: libc::pthread_t,
}

impl WorkerRef<'_> {
    /// Position of this worker in the pool, `0..thread_count`
    pub fn index(&self) -> usize {
        self.index
    }

    /// The std thread handle
    pub fn thread(&self) -> &thread::Thread {
        self.thread
    }

    /// The raw pthread handle, e.g. for `pthread_setaffinity_np`
    #[cfg(unix)]
    pub fn native_handle(&self) -> libc::pthread_t {
        self.native
    }
}

impl Pool {
    /// Create a pool of `threads` workers with the default configuration.
    ///
    /// Fails for `threads == 0` or `threads > MAX_POOL_SIZE`, and if any
    /// worker fails to spawn (already-spawned workers are stopped and
    /// joined before the error is returned).
    pub fn new(threads: usize) -> PoolResult<Self> {
        Self::with_config(threads, PoolConfig::default())
    }

    /// Create a pool with an explicit [`PoolConfig`].
    pub fn with_config(threads: usize, config: PoolConfig) -> PoolResult<Self> {
        if threads == 0 || threads > MAX_POOL_SIZE {
            return Err(PoolError::InvalidPoolSize(threads));
        }

        let initial_capacity = config.initial_queue_capacity.unwrap_or(threads);
        let queue = JobQueue::new(initial_capacity, config.queue_memory_budget)?;

        let shared = Arc::new(Shared {
            state: Mutex::new(PoolState {
                queue,
                live: threads,
            }),
            job_posted: Condvar::new(),
            job_taken: Condvar::new(),
            cancelled: AtomicBool::new(false),
        });

        let mut handles = Vec::with_capacity(threads);
        for index in 0..threads {
            let mut builder =
                thread::Builder::new().name(format!("{}-{}", config.thread_name_prefix, index));
            if let Some(stack_size) = config.stack_size {
                builder = builder.stack_size(stack_size);
            }
            let worker_shared = shared.clone();
            match builder.spawn(move || worker_loop(worker_shared, index)) {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Release partial state: stop the workers spawned so far
                    if let Ok(mut state) = shared.state.lock() {
                        state.live = index;
                    }
                    shared.cancelled.store(true, Ordering::Release);
                    shared.job_posted.notify_all();
                    for handle in handles {
                        let _ = handle.join();
                    }
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        sp_info!("pool created with {} threads", threads);

        Ok(Self {
            shared,
            handles,
            size: threads,
        })
    }

    /// Queue a job, blocking while the queue cannot accept one.
    ///
    /// Returns once the job is queued, not once it runs. With a full queue
    /// and every worker busy this is the backpressure point: the call
    /// nudges a worker (in case the stall is a sleeping consumer) and then
    /// blocks until a node frees up.
    pub fn dispatch<F>(&self, barrier: Option<&Barrier>, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.dispatch_inner(barrier, Box::new(job), None);
    }

    /// [`dispatch`](Pool::dispatch) with a cleanup handler.
    ///
    /// The cleanup runs exactly once after the job body, on normal return
    /// and when the job panics. A job that is queued but never executed
    /// (immediate shutdown) does not run its cleanup.
    pub fn dispatch_with_cleanup<F, C>(&self, barrier: Option<&Barrier>, job: F, cleanup: C)
    where
        F: FnOnce() + Send + 'static,
        C: FnOnce() + Send + 'static,
    {
        self.dispatch_inner(barrier, Box::new(job), Some(Box::new(cleanup)));
    }

    fn dispatch_inner(&self, barrier: Option<&Barrier>, job: JobFn, cleanup: Option<CleanupFn>) {
        let Ok(mut state) = self.shared.state.lock() else {
            return;
        };

        while !state.queue.can_accept() {
            sp_debug!("dispatcher: queue full, signaling 'posted', waiting on 'taken'");
            self.shared.job_posted.notify_one();
            state = match self.shared.job_taken.wait(state) {
                Ok(guard) => guard,
                Err(_) => return,
            };
        }

        state
            .queue
            .post(Job::work(job, cleanup, barrier.map(|b| b.inner())));
        self.shared.job_posted.notify_one();
    }

    /// Invoke `f` once per worker thread, in index order.
    ///
    /// Intended for one-shot per-thread configuration such as CPU affinity;
    /// does not interact with the job queue.
    pub fn for_each_thread<F>(&self, mut f: F)
    where
        F: FnMut(WorkerRef<'_>),
    {
        for (index, handle) in self.handles.iter().enumerate() {
            f(WorkerRef {
                index,
                thread: handle.thread(),
                #[cfg(unix)]
                native: native_handle_of(handle),
            });
        }
    }

    /// Number of threads the pool was created with
    pub fn thread_count(&self) -> usize {
        self.size
    }

    /// Workers that have not yet exited (equals `thread_count` outside of
    /// shutdown)
    pub fn live_threads(&self) -> usize {
        self.shared.state.lock().map(|s| s.live).unwrap_or(0)
    }

    /// Job nodes ever allocated for the queue (diagnostic; constant once
    /// the pool is warm)
    pub fn queue_capacity(&self) -> usize {
        self.shared
            .state
            .lock()
            .map(|s| s.queue.capacity())
            .unwrap_or(0)
    }

    /// Jobs ever posted to this pool (diagnostic)
    pub fn jobs_posted(&self) -> u64 {
        self.shared
            .state
            .lock()
            .map(|s| s.queue.posted())
            .unwrap_or(0)
    }

    /// Gracefully shut down: drain every queued job, then stop all workers.
    ///
    /// Posts one poison job per live worker (each is consumed exactly
    /// once); because jobs are fetched in FIFO order, all real jobs queued
    /// before this call run to completion before any worker exits. Returns
    /// after every worker has been joined.
    pub fn shutdown(mut self) {
        self.drain();
    }

    /// Immediately shut down: request every worker to stop without waiting
    /// for queued jobs.
    ///
    /// This is a cooperative stop, not a forced thread kill: a job already
    /// mid-execution runs to completion on a detached worker (its cleanup
    /// handler still runs), while queued jobs that never started are
    /// dropped without running job or cleanup. Returns promptly regardless
    /// of queue occupancy.
    pub fn shutdown_now(mut self) {
        sp_info!("immediate shutdown requested");
        self.shared.cancelled.store(true, Ordering::Release);
        self.shared.job_posted.notify_all();
        self.shared.job_taken.notify_all();
        // Detach the workers; they exit at the next loop edge
        self.handles.clear();
    }

    fn drain(&mut self) {
        if self.handles.is_empty() {
            return;
        }

        sp_info!("graceful shutdown: draining {} workers", self.size);

        let Ok(mut state) = self.shared.state.lock() else {
            return;
        };
        while state.live > 0 {
            // At most one worker exits per poison; over-posting on spurious
            // wakeups is harmless, leftovers are dropped with the queue.
            if state.queue.can_accept() {
                state.queue.post(Job::poison());
            }
            self.shared.job_posted.notify_one();
            state = match self.shared.job_taken.wait(state) {
                Ok(guard) => guard,
                Err(_) => return,
            };
            sp_debug!("destroyer: woke up, {} workers live", state.live);
        }
        drop(state);

        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }

        sp_info!("pool destroyed");
    }
}

impl Drop for Pool {
    fn drop(&mut self) {
        self.drain();
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn native_handle_of(handle: &JoinHandle<()>) -> libc::pthread_t {
            use std::os::unix::thread::JoinHandleExt;
            handle.as_pthread_t() as libc::pthread_t
        }
    }
}

/// Runs the paired cleanup when job execution leaves scope, whether the
/// job body returned or panicked.
struct CleanupGuard(Option<CleanupFn>);

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(cleanup) = self.0.take() {
            cleanup();
        }
    }
}

fn run_job(f: JobFn, cleanup: Option<CleanupFn>, index: usize) {
    let result = panic::catch_unwind(AssertUnwindSafe(move || {
        let _cleanup = CleanupGuard(cleanup);
        f();
    }));
    if result.is_err() {
        // Job-level failures are invisible to the scheduler
        sp_warn!("worker {}: job panicked", index);
    }
}

fn worker_loop(shared: Arc<Shared>, index: usize) {
    sp_debug!("worker {} starting", index);

    let Ok(mut state) = shared.state.lock() else {
        return;
    };

    loop {
        // A cancelled worker exits before touching the queue, even when
        // jobs are still pending
        loop {
            if shared.cancelled.load(Ordering::Acquire) {
                state.live -= 1;
                shared.job_taken.notify_all();
                sp_debug!("worker {} exiting (cancelled)", index);
                return;
            }
            if state.queue.is_job_available() {
                break;
            }
            state = match shared.job_posted.wait(state) {
                Ok(guard) => guard,
                Err(_) => return,
            };
        }

        let Some(job) = state.queue.fetch() else {
            continue;
        };

        match job.kind {
            JobKind::Poison => {
                // Not really taking a job, but this tells the destroyer
                // one thread has exited so it can keep destroying
                state.live -= 1;
                shared.job_taken.notify_all();
                sp_debug!("worker {} exiting (poison)", index);
                return;
            }
            JobKind::Work(f) => {
                shared.job_taken.notify_one();
                drop(state);

                run_job(f, job.cleanup, index);
                if let Some(barrier) = job.barrier {
                    barrier.signal_done();
                }

                state = match shared.state.lock() {
                    Ok(guard) => guard,
                    Err(_) => return,
                };
            }
        }
    }
}
