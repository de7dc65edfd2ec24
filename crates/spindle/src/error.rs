//! Error types for pool construction

use core::fmt;
use std::io;

/// Result type for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

/// Errors that can occur while building a pool
///
/// All failures are reported synchronously from the constructor; once a pool
/// exists, dispatch and shutdown never return errors (a dispatcher that
/// cannot enqueue blocks instead, per the backpressure contract).
#[derive(Debug)]
pub enum PoolError {
    /// Requested thread count was zero or above [`MAX_POOL_SIZE`](crate::MAX_POOL_SIZE)
    InvalidPoolSize(usize),

    /// Requested initial queue capacity was zero
    InvalidQueueCapacity,

    /// Queue memory budget too small to hold even one job node
    QueueBudgetTooSmall { budget: usize },

    /// Failed to spawn a worker thread
    Spawn(io::Error),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::InvalidPoolSize(n) => write!(f, "invalid pool size: {}", n),
            PoolError::InvalidQueueCapacity => write!(f, "initial queue capacity must be non-zero"),
            PoolError::QueueBudgetTooSmall { budget } => {
                write!(f, "queue memory budget too small: {} bytes", budget)
            }
            PoolError::Spawn(e) => write!(f, "failed to spawn worker thread: {}", e),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for PoolError {
    fn from(e: io::Error) -> Self {
        PoolError::Spawn(e)
    }
}
