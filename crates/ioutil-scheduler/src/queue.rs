//! Single-worker, time-ordered task queue.
//!
//! A [`TaskQueue`] owns one dedicated worker thread and a pending set
//! ordered by `(due, seq)`. Producers on any thread enqueue, cancel and
//! drain; the worker pops the earliest due task and runs it with the lock
//! released, so exactly one task runs at a time and producers are never
//! blocked behind task execution.
//!
//! Routing every access to an unsynchronized resource through one queue is
//! a way to serialize it without taking locks at the call sites.
//!
//! # Shutdown
//!
//! Shutdown is synchronous: the destroying thread sets the stop flag, wakes
//! the worker and joins it. Pending tasks that have not started are
//! abandoned, not drained. Join failures are logged, never propagated.

use crate::clock::{Clock, MonotonicClock};
use crate::config::{Capacity, PanicPolicy, TaskQueueConfig};
use crate::error::{SchedulingError, SchedulingResult};
use crate::stats::{QueueCounters, QueueStats};
use crate::task::{Action, PendingSet, TagMatch};
use crossbeam::channel::Sender;
use parking_lot::{Condvar, Mutex, MutexGuard};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Mutable queue state. Only touched while holding `Shared::state`.
#[derive(Debug)]
struct State {
    pending: PendingSet,
    /// Set once, permanently, when shutdown begins.
    stopping: bool,
    /// Number of `wait()` calls in progress; new work is refused while > 0.
    drainers: usize,
    /// True while the worker executes a task outside the lock.
    running: bool,
    worker: Option<ThreadId>,
}

impl State {
    fn is_idle(&self) -> bool {
        self.pending.is_empty() && !self.running
    }
}

#[derive(Debug)]
pub(crate) struct Shared {
    state: Mutex<State>,
    cv: Condvar,
    /// Mirror of `State::stopping` for lock-free fast-path checks.
    stopping: AtomicBool,
    capacity: Capacity,
    panic_policy: PanicPolicy,
    name: String,
    clock: Arc<dyn Clock>,
    counters: QueueCounters,
}

impl Shared {
    fn new(config: &TaskQueueConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(State {
                pending: PendingSet::new(),
                stopping: false,
                drainers: 0,
                running: false,
                worker: None,
            }),
            cv: Condvar::new(),
            stopping: AtomicBool::new(false),
            capacity: config.capacity,
            panic_policy: config.panic_policy,
            name: config.thread_name.clone(),
            clock,
            counters: QueueCounters::default(),
        }
    }

    fn enqueue(&self, delay: Duration, tag: Option<String>, action: Action) -> SchedulingResult {
        if self.stopping.load(Ordering::Acquire) {
            self.counters.inc_rejected_stopped();
            return Err(SchedulingError::Stopped);
        }

        let due = self.clock.deadline_after(delay)?;

        let mut state = self.state.lock();
        if state.stopping {
            self.counters.inc_rejected_stopped();
            return Err(SchedulingError::Stopped);
        }
        if state.drainers > 0 {
            self.counters.inc_rejected_draining();
            debug!(queue = %self.name, tag = ?tag, "enqueue refused while draining");
            return Err(SchedulingError::draining());
        }
        if !self.capacity.admits(state.pending.len()) {
            self.counters.inc_rejected_full();
            debug!(queue = %self.name, pending = state.pending.len(), "enqueue refused: queue full");
            return Err(SchedulingError::full());
        }

        let earliest = state.pending.push(due, tag, action);
        drop(state);

        self.counters.inc_enqueued();
        if earliest {
            self.cv.notify_all();
        }
        Ok(())
    }

    fn cancel(&self, tag: &str) -> usize {
        let removed = self.state.lock().pending.cancel(TagMatch::from_tag(tag));
        let count = removed.len();
        if count > 0 {
            self.counters.add_cancelled(count);
            self.cv.notify_all();
            debug!(queue = %self.name, tag, count, "cancelled pending tasks");
        }
        // Actions are dropped here, outside the lock.
        drop(removed);
        count
    }

    fn is_worker_thread(state: &State) -> bool {
        state.worker == Some(thread::current().id())
    }

    fn wait(&self) {
        let mut state = self.state.lock();
        if Self::is_worker_thread(&state) {
            warn!(queue = %self.name, "wait() called from a task; returning without draining");
            return;
        }
        if state.stopping || state.is_idle() {
            return;
        }

        state.drainers = state.drainers.saturating_add(1);
        while !state.stopping && !state.is_idle() {
            self.cv.wait(&mut state);
        }
        state.drainers = state.drainers.saturating_sub(1);
    }

    fn wait_until(&self, deadline: Instant) -> bool {
        let mut state = self.state.lock();
        if Self::is_worker_thread(&state) {
            warn!(queue = %self.name, "wait_timeout() called from a task; returning without draining");
            return state.is_idle();
        }
        if state.stopping || state.is_idle() {
            return true;
        }

        state.drainers = state.drainers.saturating_add(1);
        let mut drained = true;
        while !state.stopping && !state.is_idle() {
            if self.cv.wait_until(&mut state, deadline).timed_out() {
                drained = state.stopping || state.is_idle();
                break;
            }
        }
        state.drainers = state.drainers.saturating_sub(1);
        drained
    }

    /// Begin shutdown. Returns `false` if it had already begun.
    fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if state.stopping {
            return false;
        }
        state.stopping = true;
        self.stopping.store(true, Ordering::Release);
        drop(state);

        self.cv.notify_all();
        true
    }

    fn execute(&self, action: Action, seq: u64, tag: Option<&str>) {
        match panic::catch_unwind(AssertUnwindSafe(action)) {
            Ok(()) => self.counters.inc_executed(),
            Err(payload) => {
                self.counters.inc_panicked();
                error!(
                    queue = %self.name,
                    seq,
                    tag = tag.unwrap_or_default(),
                    reason = panic_message(payload.as_ref()),
                    "scheduled task panicked"
                );
                if self.panic_policy == PanicPolicy::Propagate {
                    self.stop();
                    panic::resume_unwind(payload);
                }
            }
        }
    }
}

/// Clears `running` and wakes waiters when the current task finishes,
/// including when it unwinds.
struct RunningGuard<'a> {
    shared: &'a Shared,
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.shared.state.lock().running = false;
        self.shared.cv.notify_all();
    }
}

fn worker_main(shared: Arc<Shared>, ready: Sender<()>) {
    let mut state = shared.state.lock();
    state.worker = Some(thread::current().id());
    if ready.send(()).is_err() {
        debug!(queue = %shared.name, "task queue creator went away before startup");
    }
    debug!(queue = %shared.name, "task queue worker started");

    loop {
        if state.stopping {
            break;
        }

        let Some(due) = state.pending.peek_due() else {
            shared.cv.wait(&mut state);
            continue;
        };

        let now = shared.clock.now();
        if due > now {
            // Woken early by a new earliest task, a cancel or a stop request;
            // the loop re-evaluates in every case.
            shared
                .cv
                .wait_for(&mut state, due.saturating_duration_since(now));
            continue;
        }

        let Some(task) = state.pending.pop_due(now) else {
            continue;
        };
        state.running = true;

        let (key, tag, action) = task.into_parts();
        MutexGuard::unlocked(&mut state, || {
            let _running = RunningGuard { shared: &shared };
            shared.execute(action, key.seq, tag.as_deref());
        });
    }

    debug!(
        queue = %shared.name,
        abandoned = state.pending.len(),
        "task queue worker stopped"
    );
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Time-ordered task queue served by one dedicated worker thread.
///
/// # Example
///
/// ```rust
/// use ioutil_scheduler::prelude::*;
/// use std::sync::Arc;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::time::Duration;
///
/// # fn main() -> Result<(), SchedulingError> {
/// let queue = TaskQueue::new(Capacity::bounded(16)?)?;
/// let hits = Arc::new(AtomicUsize::new(0));
///
/// let counter = Arc::clone(&hits);
/// queue.enqueue(Duration::from_millis(5), Some("tick"), move || {
///     counter.fetch_add(1, Ordering::SeqCst);
/// })?;
///
/// queue.wait();
/// assert_eq!(hits.load(Ordering::SeqCst), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct TaskQueue {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TaskQueue {
    /// Create a queue with the given capacity and default settings.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::Spawn`] if the worker thread cannot be
    /// created.
    pub fn new(capacity: Capacity) -> SchedulingResult<Self> {
        Self::with_config(TaskQueueConfig {
            capacity,
            ..TaskQueueConfig::default()
        })
    }

    /// Create a queue with no capacity limit.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::Spawn`] if the worker thread cannot be
    /// created.
    pub fn unbounded() -> SchedulingResult<Self> {
        Self::new(Capacity::Unbounded)
    }

    /// Create a queue from a full configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the worker
    /// thread cannot be created.
    pub fn with_config(config: TaskQueueConfig) -> SchedulingResult<Self> {
        Self::with_clock(config, Arc::new(MonotonicClock::new()))
    }

    /// Create a queue that reads time from `clock`.
    ///
    /// Returns once the worker thread is running.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the worker
    /// thread cannot be created.
    pub fn with_clock(config: TaskQueueConfig, clock: Arc<dyn Clock>) -> SchedulingResult<Self> {
        config.validate()?;

        let shared = Arc::new(Shared::new(&config, clock));
        let (ready_tx, ready_rx) = crossbeam::channel::bounded(1);

        let worker_shared = Arc::clone(&shared);
        let worker = thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker_main(worker_shared, ready_tx))
            .map_err(|e| SchedulingError::Spawn(e.to_string()))?;

        if ready_rx.recv().is_err() {
            if worker.join().is_err() {
                error!(queue = %config.thread_name, "task queue worker panicked during startup");
            }
            return Err(SchedulingError::Spawn(
                "worker exited during startup".to_string(),
            ));
        }

        debug!(
            queue = %config.thread_name,
            capacity = ?config.capacity.limit(),
            "task queue created"
        );
        Ok(Self {
            shared,
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Schedule `action` to run `delay` from now.
    ///
    /// # Errors
    ///
    /// - [`SchedulingError::WouldBlock`] if the queue is full or draining;
    ///   retry shortly.
    /// - [`SchedulingError::Stopped`] once shutdown has begun.
    /// - [`SchedulingError::InvalidArgument`] if the due-time overflows the
    ///   clock.
    pub fn enqueue<F>(&self, delay: Duration, tag: Option<&str>, action: F) -> SchedulingResult
    where
        F: FnOnce() + Send + 'static,
    {
        self.shared
            .enqueue(delay, tag.map(str::to_owned), Box::new(action))
    }

    /// Schedule `action` to run as soon as possible, untagged.
    ///
    /// # Errors
    ///
    /// Same as [`TaskQueue::enqueue`].
    pub fn execute<F>(&self, action: F) -> SchedulingResult
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Duration::ZERO, None, action)
    }

    /// Remove pending tasks carrying `tag`; the empty tag removes everything.
    ///
    /// A task that has already started cannot be cancelled. Returns the
    /// number of tasks removed.
    pub fn cancel(&self, tag: &str) -> usize {
        self.shared.cancel(tag)
    }

    /// Remove every pending task.
    pub fn cancel_all(&self) -> usize {
        self.shared.cancel("")
    }

    /// Block until nothing is pending or running, or the queue stops.
    ///
    /// New enqueues fail with [`SchedulingError::WouldBlock`] while this
    /// call is in progress. Calling it from inside a task returns at once.
    pub fn wait(&self) {
        self.shared.wait();
    }

    /// Like [`TaskQueue::wait`] but gives up after `timeout`.
    ///
    /// Returns `true` if the queue drained (or stopped) in time.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.shared.wait_until(deadline),
            None => {
                self.shared.wait();
                true
            }
        }
    }

    /// Stop the worker and discard pending tasks.
    ///
    /// Blocks until the worker has exited. Idempotent; also run on drop.
    pub fn shutdown(&self) {
        if self.shared.stop() {
            debug!(queue = %self.shared.name, "task queue shutting down");
        }

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if worker.thread().id() == thread::current().id() {
                error!(queue = %self.shared.name, "task queue dropped on its own worker; not joining");
            } else if let Err(payload) = worker.join() {
                error!(
                    queue = %self.shared.name,
                    reason = panic_message(payload.as_ref()),
                    "task queue worker terminated with a panic"
                );
            }
        }

        let abandoned = self.shared.state.lock().pending.drain();
        if !abandoned.is_empty() {
            self.shared.counters.add_abandoned(abandoned.len());
            debug!(
                queue = %self.shared.name,
                count = abandoned.len(),
                "discarded pending tasks at shutdown"
            );
        }
    }

    /// A weak handle that can enqueue and cancel without owning the queue.
    #[must_use]
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Number of pending (not yet started) tasks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.shared.state.lock().pending.len()
    }

    /// Returns `true` if no tasks are pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` while the worker is executing a task.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.state.lock().running
    }

    /// Returns `true` once shutdown has begun or the worker has failed hard.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared.stopping.load(Ordering::Acquire)
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> Capacity {
        self.shared.capacity
    }

    /// Worker thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Snapshot of the queue counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.shared.counters.snapshot()
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Non-owning handle to a [`TaskQueue`].
///
/// Once the queue is dropped every operation reports
/// [`SchedulingError::Stopped`] (or removes nothing).
#[derive(Debug, Clone)]
pub struct QueueHandle {
    shared: Weak<Shared>,
}

impl QueueHandle {
    /// See [`TaskQueue::enqueue`].
    ///
    /// # Errors
    ///
    /// Same as [`TaskQueue::enqueue`], plus [`SchedulingError::Stopped`] if
    /// the queue no longer exists.
    pub fn enqueue<F>(&self, delay: Duration, tag: Option<&str>, action: F) -> SchedulingResult
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue_boxed(delay, tag.map(str::to_owned), Box::new(action))
    }

    pub(crate) fn enqueue_boxed(
        &self,
        delay: Duration,
        tag: Option<String>,
        action: Action,
    ) -> SchedulingResult {
        let shared = self.shared.upgrade().ok_or(SchedulingError::Stopped)?;
        shared.enqueue(delay, tag, action)
    }

    /// Panic policy of the queue, or `None` once it is gone.
    pub(crate) fn panic_policy(&self) -> Option<PanicPolicy> {
        self.shared.upgrade().map(|shared| shared.panic_policy)
    }

    /// See [`TaskQueue::execute`].
    ///
    /// # Errors
    ///
    /// Same as [`QueueHandle::enqueue`].
    pub fn execute<F>(&self, action: F) -> SchedulingResult
    where
        F: FnOnce() + Send + 'static,
    {
        self.enqueue(Duration::ZERO, None, action)
    }

    /// See [`TaskQueue::cancel`].
    pub fn cancel(&self, tag: &str) -> usize {
        self.shared.upgrade().map_or(0, |shared| shared.cancel(tag))
    }

    /// Returns `true` if the queue is gone or shutting down.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.shared
            .upgrade()
            .is_none_or(|shared| shared.stopping.load(Ordering::Acquire))
    }
}
