//! Task queue and periodic task configuration.

use crate::error::{SchedulingError, SchedulingResult};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Default worker thread name.
pub const DEFAULT_THREAD_NAME: &str = "ioutil-task-queue";

/// Default number of direct invocations a periodic task makes while its
/// queue keeps refusing resubmission.
pub const DEFAULT_MAX_BYPASS_RUNS: u32 = 3;

/// Maximum number of pending tasks a queue admits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    /// At most this many pending tasks.
    Bounded(NonZeroUsize),
    /// No limit.
    #[default]
    Unbounded,
}

impl Capacity {
    /// No limit on pending tasks.
    pub const UNBOUNDED: Self = Self::Unbounded;

    /// A bounded capacity.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::InvalidArgument`] if `limit` is zero, since
    /// such a queue could never accept a task.
    pub fn bounded(limit: usize) -> SchedulingResult<Self> {
        NonZeroUsize::new(limit)
            .map(Self::Bounded)
            .ok_or_else(|| SchedulingError::invalid_argument("capacity must be greater than 0"))
    }

    /// The limit, or `None` when unbounded.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        match self {
            Self::Bounded(limit) => Some(limit.get()),
            Self::Unbounded => None,
        }
    }

    /// Returns `true` if a set holding `pending` tasks can take one more.
    #[inline]
    #[must_use]
    pub fn admits(&self, pending: usize) -> bool {
        self.limit().is_none_or(|limit| pending < limit)
    }
}

/// What the worker does when a task panics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanicPolicy {
    /// Log the panic and keep serving the queue.
    #[default]
    CatchAndLog,
    /// Stop the queue and let the panic unwind the worker thread.
    ///
    /// The queue refuses all further work; the join failure is logged when
    /// the queue is shut down.
    Propagate,
}

/// Task queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskQueueConfig {
    /// Maximum number of pending tasks.
    pub capacity: Capacity,
    /// Name given to the worker thread.
    pub thread_name: String,
    /// Behaviour when a task panics.
    pub panic_policy: PanicPolicy,
}

impl Default for TaskQueueConfig {
    fn default() -> Self {
        Self {
            capacity: Capacity::Unbounded,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
            panic_policy: PanicPolicy::CatchAndLog,
        }
    }
}

impl TaskQueueConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread name is empty or contains a NUL byte.
    pub fn validate(&self) -> SchedulingResult<()> {
        if self.thread_name.is_empty() {
            return Err(SchedulingError::invalid_argument(
                "thread_name must not be empty",
            ));
        }
        if self.thread_name.contains('\0') {
            return Err(SchedulingError::invalid_argument(
                "thread_name must not contain NUL bytes",
            ));
        }
        Ok(())
    }

    /// Create a configuration builder.
    #[must_use]
    pub fn builder() -> TaskQueueConfigBuilder {
        TaskQueueConfigBuilder::default()
    }
}

/// Builder for `TaskQueueConfig`.
#[derive(Debug, Default)]
pub struct TaskQueueConfigBuilder {
    config: TaskQueueConfig,
}

impl TaskQueueConfigBuilder {
    /// Set the capacity.
    #[must_use]
    pub fn capacity(mut self, capacity: Capacity) -> Self {
        self.config.capacity = capacity;
        self
    }

    /// Set the worker thread name.
    #[must_use]
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.config.thread_name = name.into();
        self
    }

    /// Set the panic policy.
    #[must_use]
    pub fn panic_policy(mut self, policy: PanicPolicy) -> Self {
        self.config.panic_policy = policy;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> SchedulingResult<TaskQueueConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Periodic task configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeriodicConfig {
    /// Time between invocations.
    pub interval: Duration,
    /// Direct invocations allowed while resubmission keeps hitting
    /// backpressure. Zero disables the bypass entirely.
    pub max_bypass_runs: u32,
}

impl Default for PeriodicConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_bypass_runs: DEFAULT_MAX_BYPASS_RUNS,
        }
    }
}

impl PeriodicConfig {
    /// Configuration with the given interval and default bypass limit.
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            ..Self::default()
        }
    }

    /// Set the bypass limit.
    #[must_use]
    pub fn with_max_bypass_runs(mut self, runs: u32) -> Self {
        self.max_bypass_runs = runs;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulingError::InvalidArgument`] if the interval is zero.
    pub fn validate(&self) -> SchedulingResult<()> {
        if self.interval.is_zero() {
            return Err(SchedulingError::invalid_argument(
                "interval must be greater than 0",
            ));
        }
        Ok(())
    }
}
