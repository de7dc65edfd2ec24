//! # spindle - Fixed-Size Worker-Thread Pool
//!
//! A pool of long-lived worker threads fed from a bounded, node-recycling
//! job queue, with completion barriers for batch waits and two shutdown
//! protocols (graceful drain, immediate stop).
//!
//! ## Features
//!
//! - **Recycling queue**: job nodes are pre-allocated and reused; growth is
//!   bounded by a byte budget, which doubles as the backpressure trigger
//! - **Backpressure**: with a full queue and all workers busy, `dispatch`
//!   blocks until a worker frees a node
//! - **Completion barriers**: tag a wave of dispatches and wait for all of
//!   them to finish
//! - **Cleanup handlers**: per-job cleanup guaranteed to run after the job
//!   body, on normal return and on panic
//! - **Two teardowns**: graceful drain via poison jobs, or a prompt
//!   cooperative stop that abandons queued work
//!
//! ## Quick Start
//!
//! ```ignore
//! use spindle::{Barrier, Pool};
//!
//! fn main() {
//!     let pool = Pool::new(10).expect("create pool");
//!
//!     let barrier = Barrier::new();
//!     barrier.start();
//!     for i in 0..10 {
//!         pool.dispatch(Some(&barrier), move || {
//!             println!("worker #{} is done", i);
//!         });
//!     }
//!     barrier.end();
//!
//!     // All ten jobs have finished here
//!     pool.shutdown();
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  dispatch   ┌─────────────────────────────┐
//! │ Producer(s)  │ ──────────▶ │  JobQueue (recycling arena) │
//! └──────────────┘  (blocks    │  free stack │ active FIFO   │
//!        ▲           when full)└─────────────────────────────┘
//!        │ job_taken                   │ job_posted
//!        │                             ▼
//!        │                ┌──────────┬──────────┬──────────┐
//!        └────────────────│ Worker 0 │ Worker 1 │ Worker N │
//!                         └──────────┴──────────┴──────────┘
//!                               │ signal_done
//!                               ▼
//!                         ┌──────────┐
//!                         │ Barrier  │◀── wait()
//!                         └──────────┘
//! ```
//!
//! Ordering: jobs are dispatched and fetched in FIFO order per pool. No
//! ordering is guaranteed between completions of concurrently-running jobs;
//! a barrier only guarantees "all jobs posted against it have finished".

pub mod barrier;
pub mod config;
pub mod dlog;
pub mod error;
pub mod pool;

mod queue;

// Re-exports for convenience
pub use barrier::Barrier;
pub use config::{PoolConfig, MAX_POOL_SIZE};
pub use error::{PoolError, PoolResult};
pub use pool::{Pool, WorkerRef};
