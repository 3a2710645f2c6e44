//! Monotonic time source used to compute absolute due-times.

use crate::error::{SchedulingError, SchedulingResult};
use std::fmt;
use std::time::{Duration, Instant};

/// Source of monotonic instants.
///
/// Implementations must never run backward. Wall-clock time is not an
/// acceptable source: an adjustment would fire tasks early or late.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant.
    fn now(&self) -> Instant;

    /// Absolute instant `delay` from now.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::InvalidArgument`] if the resulting instant
    /// cannot be represented.
    fn deadline_after(&self, delay: Duration) -> SchedulingResult<Instant> {
        self.now().checked_add(delay).ok_or_else(|| {
            SchedulingError::invalid_argument(format!("delay {delay:?} overflows the clock"))
        })
    }
}

/// Default clock, backed by [`Instant::now`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl MonotonicClock {
    /// Create a new monotonic clock.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}
