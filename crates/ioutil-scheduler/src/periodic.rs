//! Self-resubmitting periodic tasks built on [`TaskQueue`].
//!
//! A [`PeriodicTask`] is an ordinary producer: each firing runs the user
//! action on the queue's worker and then enqueues the next firing under a
//! private tag. Stopping cancels whatever instance is pending; an instance
//! already running is left to finish and simply does not resubmit.

use crate::config::{PanicPolicy, PeriodicConfig};
use crate::error::{SchedulingError, SchedulingResult};
use crate::queue::{QueueHandle, TaskQueue, panic_message};
use parking_lot::Mutex;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

type PeriodicAction = Box<dyn FnMut() + Send + 'static>;

struct Runner {
    queue: QueueHandle,
    tag: String,
    config: PeriodicConfig,
    stopping: AtomicBool,
    invocations: AtomicU64,
    action: Mutex<PeriodicAction>,
}

impl Runner {
    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    fn schedule(self: &Arc<Self>) -> SchedulingResult {
        let runner = Arc::clone(self);
        self.queue.enqueue_boxed(
            self.config.interval,
            Some(self.tag.clone()),
            Box::new(move || runner.fire()),
        )
    }

    /// Run the user action once. A panic is logged and the cadence goes on,
    /// unless the queue is configured to propagate panics.
    fn invoke(&self) {
        let outcome = {
            let mut action = self.action.lock();
            panic::catch_unwind(AssertUnwindSafe(|| (*action)()))
        };
        self.invocations.fetch_add(1, Ordering::Relaxed);

        if let Err(payload) = outcome {
            if self.queue.panic_policy() == Some(PanicPolicy::Propagate) {
                self.stopping.store(true, Ordering::Release);
                panic::resume_unwind(payload);
            }
            error!(
                tag = %self.tag,
                reason = panic_message(payload.as_ref()),
                "periodic action panicked; keeping schedule"
            );
        }
    }

    /// Undo a resubmission that raced with `stop()`.
    fn cancel_if_stopped(&self) {
        if self.is_stopping() {
            let cancelled = self.queue.cancel(&self.tag);
            debug!(tag = %self.tag, cancelled, "withdrew resubmission after stop");
        }
    }

    /// Runs on the queue's worker thread.
    fn fire(self: Arc<Self>) {
        if self.is_stopping() {
            return;
        }
        self.invoke();

        let mut bypass_runs: u32 = 0;
        loop {
            if self.is_stopping() {
                return;
            }

            match self.schedule() {
                Ok(()) => {
                    self.cancel_if_stopped();
                    return;
                }
                Err(SchedulingError::WouldBlock(reason)) => {
                    if bypass_runs >= self.config.max_bypass_runs {
                        warn!(
                            tag = %self.tag,
                            %reason,
                            bypass_runs,
                            "periodic task giving up after sustained backpressure"
                        );
                        self.stopping.store(true, Ordering::Release);
                        return;
                    }
                    bypass_runs = bypass_runs.saturating_add(1);
                    warn!(
                        tag = %self.tag,
                        %reason,
                        "periodic resubmission refused; running directly after one interval"
                    );

                    thread::sleep(self.config.interval);
                    if self.is_stopping() {
                        return;
                    }
                    self.invoke();
                }
                Err(SchedulingError::Stopped) => {
                    debug!(tag = %self.tag, "queue stopped; periodic task ends");
                    self.stopping.store(true, Ordering::Release);
                    return;
                }
                Err(e) => {
                    error!(tag = %self.tag, error = %e, "periodic task could not be rescheduled");
                    self.stopping.store(true, Ordering::Release);
                    return;
                }
            }
        }
    }
}

/// Action that runs every `interval` on a borrowed [`TaskQueue`].
///
/// The queue must outlive the periodic task. Dropping the periodic task
/// stops it.
///
/// # Example
///
/// ```rust
/// use ioutil_scheduler::prelude::*;
/// use std::time::Duration;
///
/// # fn main() -> Result<(), SchedulingError> {
/// let queue = TaskQueue::unbounded()?;
/// let heartbeat = PeriodicTask::new(&queue, Duration::from_millis(50), || {
///     // flush, poll, report...
/// })?;
///
/// assert!(heartbeat.tag().starts_with("periodic-"));
/// drop(heartbeat);
/// # Ok(())
/// # }
/// ```
pub struct PeriodicTask<'q> {
    queue: &'q TaskQueue,
    runner: Arc<Runner>,
}

impl<'q> PeriodicTask<'q> {
    /// Start running `action` every `interval`; the first run happens one
    /// interval from now.
    ///
    /// # Errors
    ///
    /// - [`SchedulingError::InvalidArgument`] if `interval` is zero.
    /// - Any error from the initial [`TaskQueue::enqueue`].
    pub fn new<F>(queue: &'q TaskQueue, interval: Duration, action: F) -> SchedulingResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        Self::with_config(queue, PeriodicConfig::new(interval), action)
    }

    /// Start a periodic task from a full configuration.
    ///
    /// # Errors
    ///
    /// Same as [`PeriodicTask::new`].
    pub fn with_config<F>(
        queue: &'q TaskQueue,
        config: PeriodicConfig,
        action: F,
    ) -> SchedulingResult<Self>
    where
        F: FnMut() + Send + 'static,
    {
        config.validate()?;

        let runner = Arc::new(Runner {
            queue: queue.handle(),
            tag: format!("periodic-{}", Uuid::new_v4()),
            config,
            stopping: AtomicBool::new(false),
            invocations: AtomicU64::new(0),
            action: Mutex::new(Box::new(action)),
        });
        runner.schedule()?;

        debug!(
            tag = %runner.tag,
            interval = ?config.interval,
            "periodic task started"
        );
        Ok(Self { queue, runner })
    }

    /// Stop rescheduling and cancel the pending instance.
    ///
    /// An invocation already running completes. Idempotent.
    pub fn stop(&self) {
        self.runner.stopping.store(true, Ordering::Release);
        let cancelled = self.queue.cancel(&self.runner.tag);
        debug!(tag = %self.runner.tag, cancelled, "periodic task stopped");
    }

    /// The private tag this task's queue entries carry.
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.runner.tag
    }

    /// Time between invocations.
    #[must_use]
    pub fn interval(&self) -> Duration {
        self.runner.config.interval
    }

    /// Number of invocations of the user action, including ones that
    /// panicked.
    #[must_use]
    pub fn invocations(&self) -> u64 {
        self.runner.invocations.load(Ordering::Relaxed)
    }

    /// Returns `true` once stopped, either explicitly or because the queue
    /// could no longer take it.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.runner.is_stopping()
    }
}

impl fmt::Debug for PeriodicTask<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PeriodicTask")
            .field("tag", &self.runner.tag)
            .field("interval", &self.runner.config.interval)
            .field("invocations", &self.invocations())
            .field("stopped", &self.is_stopped())
            .finish_non_exhaustive()
    }
}

impl Drop for PeriodicTask<'_> {
    fn drop(&mut self) {
        self.stop();
    }
}
