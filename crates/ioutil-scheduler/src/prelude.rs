//! Prelude for ioutil-scheduler.
//!
//! ```rust
//! use ioutil_scheduler::prelude::*;
//!
//! # fn main() -> Result<(), SchedulingError> {
//! let queue = TaskQueue::unbounded()?;
//! queue.execute(|| {})?;
//! queue.wait();
//! # Ok(())
//! # }
//! ```

pub use crate::clock::{Clock, MonotonicClock};
pub use crate::config::{Capacity, PanicPolicy, PeriodicConfig, TaskQueueConfig};
pub use crate::error::{BackpressureReason, SchedulingError, SchedulingResult};
pub use crate::periodic::PeriodicTask;
pub use crate::queue::{QueueHandle, TaskQueue};
pub use crate::stats::QueueStats;
