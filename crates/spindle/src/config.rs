//! Pool configuration
//!
//! Provides compile-time defaults with runtime environment overrides.
//!
//! # Configuration Priority (highest wins)
//!
//! 1. Builder setters (programmatic)
//! 2. Environment variables (runtime)
//! 3. Library defaults
//!
//! # Example
//!
//! ```rust,ignore
//! use spindle::PoolConfig;
//!
//! // Use defaults with env overrides
//! let config = PoolConfig::from_env();
//!
//! // Or customize programmatically
//! let config = PoolConfig::from_env()
//!     .queue_memory_budget(128 * 1024)
//!     .thread_name_prefix("render");
//! ```

use std::env;
use std::str::FromStr;

/// Maximum number of threads allowed in one pool
pub const MAX_POOL_SIZE: usize = 200;

/// Compile-time defaults
pub mod defaults {
    /// Total byte budget bounding job-queue growth
    pub const QUEUE_MEMORY_BUDGET: usize = 65536;

    /// Worker thread name prefix ("spindle-0", "spindle-1", ...)
    pub const THREAD_NAME_PREFIX: &str = "spindle";
}

/// Read an env var and parse it, falling back to `default`
fn env_get<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(val) => val.parse().unwrap_or(default),
        Err(_) => default,
    }
}

/// Pool configuration with builder pattern.
///
/// Use `from_env()` to start with compile-time defaults and apply any
/// environment variable overrides.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Byte budget bounding job-queue growth; the queue never allocates
    /// more than `queue_memory_budget / node_size` job nodes
    pub queue_memory_budget: usize,
    /// Free nodes pre-allocated at pool creation (default: the thread count)
    pub initial_queue_capacity: Option<usize>,
    /// Stack size per worker thread (default: platform default)
    pub stack_size: Option<usize>,
    /// Worker thread name prefix
    pub thread_name_prefix: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

impl PoolConfig {
    /// Create config from compile-time defaults with environment overrides.
    ///
    /// Environment variables (all optional):
    /// - `SPINDLE_QUEUE_MEMORY_BUDGET` - Queue growth budget in bytes
    /// - `SPINDLE_INITIAL_QUEUE_CAPACITY` - Pre-allocated free nodes
    /// - `SPINDLE_STACK_SIZE` - Worker stack size in bytes
    pub fn from_env() -> Self {
        let mut config = Self::new();
        config.queue_memory_budget =
            env_get("SPINDLE_QUEUE_MEMORY_BUDGET", config.queue_memory_budget);
        if let Ok(val) = env::var("SPINDLE_INITIAL_QUEUE_CAPACITY") {
            if let Ok(cap) = val.parse() {
                config.initial_queue_capacity = Some(cap);
            }
        }
        if let Ok(val) = env::var("SPINDLE_STACK_SIZE") {
            if let Ok(size) = val.parse() {
                config.stack_size = Some(size);
            }
        }
        config
    }

    /// Create config with explicit defaults (no env override).
    /// Useful for testing or when you want full control.
    pub fn new() -> Self {
        Self {
            queue_memory_budget: defaults::QUEUE_MEMORY_BUDGET,
            initial_queue_capacity: None,
            stack_size: None,
            thread_name_prefix: defaults::THREAD_NAME_PREFIX.to_string(),
        }
    }

    /// Set the queue growth budget in bytes
    pub fn queue_memory_budget(mut self, bytes: usize) -> Self {
        self.queue_memory_budget = bytes;
        self
    }

    /// Set the number of free nodes pre-allocated at pool creation
    pub fn initial_queue_capacity(mut self, nodes: usize) -> Self {
        self.initial_queue_capacity = Some(nodes);
        self
    }

    /// Set the worker thread stack size
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }

    /// Set the worker thread name prefix
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Byte budget that admits exactly `jobs` queued jobs.
    ///
    /// The job-node size is an implementation detail; this translates a
    /// desired maximum queue length into a `queue_memory_budget` value.
    pub fn budget_for(jobs: usize) -> usize {
        jobs * crate::queue::node_size()
    }
}
