//! Bounded, node-recycling job queue
//!
//! A slot arena of job nodes partitioned between a free stack (indices of
//! recyclable nodes) and an active list (indices of pending jobs, oldest at
//! the front). Once the pool is warm, posting and fetching only move indices
//! between the two lists; nodes are allocated at most once, and never past
//! the memory budget fixed at construction.
//!
//! Jobs are fetched in FIFO order. The queue is not synchronized itself;
//! the pool calls in with its own mutex held.

use std::collections::VecDeque;
use std::mem;
use std::sync::Arc;

use crate::barrier::BarrierInner;
use crate::error::{PoolError, PoolResult};

/// A unit of work submitted to the pool
pub(crate) type JobFn = Box<dyn FnOnce() + Send + 'static>;

/// Cleanup handler paired with a job; runs after the job body on every
/// exit path the runtime can intercept (normal return, panic)
pub(crate) type CleanupFn = Box<dyn FnOnce() + Send + 'static>;

pub(crate) enum JobKind {
    /// User-supplied work
    Work(JobFn),
    /// Exit sentinel consumed once per worker during graceful shutdown
    Poison,
}

/// One pending unit of work, as stored in a queue node
pub(crate) struct Job {
    pub(crate) kind: JobKind,
    pub(crate) cleanup: Option<CleanupFn>,
    pub(crate) barrier: Option<Arc<BarrierInner>>,
}

impl Job {
    pub(crate) fn work(
        f: JobFn,
        cleanup: Option<CleanupFn>,
        barrier: Option<Arc<BarrierInner>>,
    ) -> Self {
        Self {
            kind: JobKind::Work(f),
            cleanup,
            barrier,
        }
    }

    pub(crate) fn poison() -> Self {
        Self {
            kind: JobKind::Poison,
            cleanup: None,
            barrier: None,
        }
    }
}

/// A recyclable slot. Empty while its index sits on the free stack.
struct Node {
    job: Option<Job>,
}

/// Size of one job node, used to derive the capacity ceiling from the
/// memory budget
pub(crate) fn node_size() -> usize {
    mem::size_of::<Node>()
}

pub(crate) struct JobQueue {
    /// Slot arena; `nodes.len()` is the capacity ever allocated
    nodes: Vec<Node>,
    /// Stack of recyclable node indices
    free: Vec<usize>,
    /// Pending job indices, oldest at the front
    active: VecDeque<usize>,
    /// Hard ceiling on `nodes.len()`, from the memory budget
    max_capacity: usize,
    /// Jobs ever posted (diagnostic)
    posted: u64,
}

impl JobQueue {
    /// Create a queue with up to `initial_capacity` pre-allocated free
    /// nodes, capped by `memory_budget / node_size`.
    pub(crate) fn new(initial_capacity: usize, memory_budget: usize) -> PoolResult<Self> {
        if initial_capacity == 0 {
            return Err(PoolError::InvalidQueueCapacity);
        }
        let max_capacity = memory_budget / node_size();
        if max_capacity == 0 {
            return Err(PoolError::QueueBudgetTooSmall {
                budget: memory_budget,
            });
        }

        let capacity = initial_capacity.min(max_capacity);
        let nodes = (0..capacity).map(|_| Node { job: None }).collect();
        Ok(Self {
            nodes,
            free: (0..capacity).rev().collect(),
            active: VecDeque::with_capacity(capacity),
            max_capacity,
            posted: 0,
        })
    }

    /// True if a post would succeed: a recycled node exists, or the budget
    /// still allows allocating a fresh one. False is the backpressure
    /// signal; the producer must block on `job_taken`.
    pub(crate) fn can_accept(&self) -> bool {
        !self.free.is_empty() || self.nodes.len() < self.max_capacity
    }

    /// Append a job. Caller must hold the pool mutex and have checked
    /// `can_accept`; never blocks.
    pub(crate) fn post(&mut self, job: Job) {
        let idx = match self.free.pop() {
            Some(idx) => idx,
            None => {
                debug_assert!(self.nodes.len() < self.max_capacity);
                if self.nodes.len() >= self.max_capacity {
                    return;
                }
                self.nodes.push(Node { job: None });
                self.nodes.len() - 1
            }
        };

        if let Some(barrier) = &job.barrier {
            barrier.add_posted();
        }

        self.nodes[idx].job = Some(job);
        self.active.push_back(idx);
        self.posted += 1;
    }

    /// Remove and return the oldest pending job, recycling its node.
    pub(crate) fn fetch(&mut self) -> Option<Job> {
        let idx = self.active.pop_front()?;
        let job = self.nodes[idx].job.take();
        debug_assert!(job.is_some());
        self.free.push(idx);
        job
    }

    pub(crate) fn is_job_available(&self) -> bool {
        !self.active.is_empty()
    }

    /// Nodes ever allocated for this queue
    pub(crate) fn capacity(&self) -> usize {
        self.nodes.len()
    }

    /// Jobs ever posted
    pub(crate) fn posted(&self) -> u64 {
        self.posted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn run(job: Job) {
        match job.kind {
            JobKind::Work(f) => f(),
            JobKind::Poison => panic!("unexpected poison"),
        }
    }

    fn tag_job(order: &Arc<std::sync::Mutex<Vec<usize>>>, tag: usize) -> Job {
        let order = order.clone();
        Job::work(
            Box::new(move || order.lock().unwrap().push(tag)),
            None,
            None,
        )
    }

    #[test]
    fn test_fifo_order() {
        let mut q = JobQueue::new(4, 4 * node_size()).unwrap();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));

        for tag in [1, 2, 3] {
            q.post(tag_job(&order, tag));
        }
        while let Some(job) = q.fetch() {
            run(job);
        }
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_recycling_keeps_capacity_constant() {
        let mut q = JobQueue::new(2, 65536).unwrap();
        assert_eq!(q.capacity(), 2);

        for _ in 0..10 {
            q.post(Job::work(Box::new(|| {}), None, None));
            q.post(Job::work(Box::new(|| {}), None, None));
            q.fetch().unwrap();
            q.fetch().unwrap();
        }
        assert_eq!(q.capacity(), 2);
        assert_eq!(q.posted(), 20);
    }

    #[test]
    fn test_grows_only_up_to_budget() {
        let mut q = JobQueue::new(1, 2 * node_size()).unwrap();
        assert!(q.can_accept());
        q.post(Job::work(Box::new(|| {}), None, None));

        // One node left in the budget, none free
        assert!(q.can_accept());
        q.post(Job::work(Box::new(|| {}), None, None));
        assert_eq!(q.capacity(), 2);
        assert!(!q.can_accept());

        // Fetch recycles a node, lifting the backpressure
        q.fetch().unwrap();
        assert!(q.can_accept());
    }

    #[test]
    fn test_initial_capacity_clamped_to_budget() {
        let q = JobQueue::new(100, 3 * node_size()).unwrap();
        assert_eq!(q.capacity(), 3);
    }

    #[test]
    fn test_rejects_zero_capacity_and_tiny_budget() {
        assert!(matches!(
            JobQueue::new(0, 65536),
            Err(PoolError::InvalidQueueCapacity)
        ));
        assert!(matches!(
            JobQueue::new(1, 1),
            Err(PoolError::QueueBudgetTooSmall { budget: 1 })
        ));
    }

    #[test]
    fn test_fetch_empty_returns_none() {
        let mut q = JobQueue::new(1, 65536).unwrap();
        assert!(!q.is_job_available());
        assert!(q.fetch().is_none());
    }

    #[test]
    fn test_post_bumps_barrier_posted_count() {
        let mut q = JobQueue::new(2, 65536).unwrap();
        let barrier = Arc::new(BarrierInner::new());
        q.post(Job::work(Box::new(|| {}), None, Some(barrier.clone())));
        q.post(Job::work(Box::new(|| {}), None, Some(barrier.clone())));
        assert_eq!(barrier.posted_count(), 2);
    }

    #[test]
    fn test_cleanup_travels_with_job() {
        let mut q = JobQueue::new(1, 65536).unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        q.post(Job::work(
            Box::new(|| {}),
            Some(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            })),
            None,
        ));
        let job = q.fetch().unwrap();
        assert!(job.cleanup.is_some());
    }
}
