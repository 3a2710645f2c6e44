//! Error types for the scheduler crate.
//!
//! Admission failures are reported as values so callers can apply their own
//! backoff policy. Nothing here is raised during shutdown; destruction logs
//! and swallows its own failures.

use std::fmt;
use thiserror::Error;

/// Why a queue refused to accept new work right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackpressureReason {
    /// The pending set is at capacity.
    Full,
    /// A `wait()` call is draining the queue.
    Draining,
}

impl fmt::Display for BackpressureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackpressureReason::Full => write!(f, "queue full; retry shortly"),
            BackpressureReason::Draining => {
                write!(f, "queue is currently draining; retry shortly")
            }
        }
    }
}

/// Errors returned by [`TaskQueue`](crate::TaskQueue) and
/// [`PeriodicTask`](crate::PeriodicTask) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulingError {
    /// An argument was rejected synchronously. Never worth retrying.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The queue cannot take the task at the moment; retry after a short delay.
    #[error("Would block: {0}")]
    WouldBlock(BackpressureReason),

    /// The queue has begun shutting down or its worker has terminated.
    #[error("Task queue is stopped")]
    Stopped,

    /// The worker thread could not be started.
    #[error("Failed to spawn worker thread: {0}")]
    Spawn(String),
}

impl SchedulingError {
    /// Create an invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument(reason.into())
    }

    /// Create a "queue full" backpressure error.
    #[must_use]
    pub fn full() -> Self {
        Self::WouldBlock(BackpressureReason::Full)
    }

    /// Create a "queue draining" backpressure error.
    #[must_use]
    pub fn draining() -> Self {
        Self::WouldBlock(BackpressureReason::Draining)
    }

    /// Returns `true` for transient backpressure errors.
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        matches!(self, Self::WouldBlock(_))
    }

    /// Returns `true` if retrying the same call later may succeed.
    ///
    /// Only backpressure qualifies; a stopped queue never comes back.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.is_would_block()
    }
}

/// A specialized `Result` type for scheduling operations.
pub type SchedulingResult<T = ()> = std::result::Result<T, SchedulingError>;
