//! # ioutil-scheduler
//!
//! Time-ordered task scheduling on a single dedicated worker thread.
//!
//! This crate is the concurrency core of the ioutil I/O helpers. Callers
//! such as an HTTP client or a rolling file writer route their work through
//! a [`TaskQueue`] so that an otherwise unsynchronized resource is touched
//! by exactly one thread at a time.
//!
//! - [`TaskQueue`] - worker thread plus a pending set ordered by due-time,
//!   with tag cancellation, bounded-capacity backpressure and drain
//! - [`PeriodicTask`] - a self-resubmitting action on a borrowed queue
//! - [`Clock`] - monotonic time source used to compute due-times
//! - [`SchedulingError`] - explicit admission errors (`WouldBlock`,
//!   `InvalidArgument`, `Stopped`)
//!
//! ## Guarantees
//!
//! - Tasks run in non-decreasing due-time order; equal due-times run in
//!   enqueue order
//! - At most one task runs at a time per queue
//! - No lock is held while a task runs
//! - Capacity is enforced at enqueue time; a full queue answers
//!   immediately with [`SchedulingError::WouldBlock`] instead of blocking
//! - Shutdown joins the worker and abandons tasks that have not started
//!
//! ## Example
//!
//! ```rust
//! use ioutil_scheduler::prelude::*;
//! use std::sync::mpsc;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), SchedulingError> {
//! let queue = TaskQueue::new(Capacity::bounded(4)?)?;
//! let (tx, rx) = mpsc::channel();
//!
//! for (delay_ms, name) in [(30, "late"), (10, "early")] {
//!     let tx = tx.clone();
//!     queue.enqueue(Duration::from_millis(delay_ms), Some(name), move || {
//!         let _ = tx.send(name);
//!     })?;
//! }
//!
//! queue.wait();
//! assert_eq!(rx.try_iter().collect::<Vec<_>>(), ["early", "late"]);
//! # Ok(())
//! # }
//! ```

#![deny(
    unsafe_op_in_unsafe_fn,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    missing_debug_implementations
)]
#![warn(clippy::pedantic)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod clock;
pub mod config;
pub mod error;
pub mod periodic;
pub mod queue;
pub mod stats;
pub mod task;

pub mod prelude;

pub use clock::{Clock, MonotonicClock};
pub use config::{Capacity, PanicPolicy, PeriodicConfig, TaskQueueConfig, TaskQueueConfigBuilder};
pub use error::{BackpressureReason, SchedulingError, SchedulingResult};
pub use periodic::PeriodicTask;
pub use queue::{QueueHandle, TaskQueue};
pub use stats::QueueStats;
pub use task::{Action, PendingSet, ScheduledTask, TagMatch, TaskKey};
