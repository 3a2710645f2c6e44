//! Scheduled task values and the time-ordered pending set.
//!
//! Tasks are keyed by `(due, seq)`. The sequence number is assigned at
//! insertion and only ever grows, so tasks sharing a due-time run in the
//! order they were enqueued.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

/// Zero-argument unit of work executed on the worker thread.
pub type Action = Box<dyn FnOnce() + Send + 'static>;

/// Sort key of a pending task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskKey {
    /// Absolute due-time.
    pub due: Instant,
    /// Insertion sequence number, used as tie-break.
    pub seq: u64,
}

/// An immutable scheduled unit of work.
pub struct ScheduledTask {
    key: TaskKey,
    tag: Option<String>,
    action: Action,
}

impl ScheduledTask {
    /// Create a task due at `due`.
    #[must_use]
    pub fn new(due: Instant, seq: u64, tag: Option<String>, action: Action) -> Self {
        Self {
            key: TaskKey { due, seq },
            tag,
            action,
        }
    }

    /// Absolute due-time.
    #[inline]
    #[must_use]
    pub fn due(&self) -> Instant {
        self.key.due
    }

    /// Insertion sequence number.
    #[inline]
    #[must_use]
    pub fn seq(&self) -> u64 {
        self.key.seq
    }

    /// Cancellation tag, if any.
    #[inline]
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Split the task into its key, tag and action.
    #[must_use]
    pub fn into_parts(self) -> (TaskKey, Option<String>, Action) {
        (self.key, self.tag, self.action)
    }
}

impl fmt::Debug for ScheduledTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTask")
            .field("due", &self.key.due)
            .field("seq", &self.key.seq)
            .field("tag", &self.tag)
            .finish_non_exhaustive()
    }
}

/// Which pending tasks a cancellation applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMatch<'a> {
    /// Every pending task, tagged or not.
    All,
    /// Only tasks whose tag equals the given string.
    Exact(&'a str),
}

impl<'a> TagMatch<'a> {
    /// Interpret a caller-supplied tag; the empty string matches everything.
    #[must_use]
    pub fn from_tag(tag: &'a str) -> Self {
        if tag.is_empty() {
            Self::All
        } else {
            Self::Exact(tag)
        }
    }

    /// Returns `true` if a task carrying `tag` is selected.
    #[must_use]
    pub fn matches(&self, tag: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Exact(wanted) => tag == Some(*wanted),
        }
    }
}

/// Ordered multiset of pending tasks.
#[derive(Debug, Default)]
pub struct PendingSet {
    entries: BTreeMap<TaskKey, ScheduledTask>,
    next_seq: u64,
}

impl PendingSet {
    /// Create an empty pending set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a task and return `true` if it is now the earliest pending one.
    pub fn push(&mut self, due: Instant, tag: Option<String>, action: Action) -> bool {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        let task = ScheduledTask::new(due, seq, tag, action);
        let key = task.key;
        self.entries.insert(key, task);

        self.entries.first_key_value().map(|(first, _)| *first) == Some(key)
    }

    /// Due-time of the earliest pending task.
    #[must_use]
    pub fn peek_due(&self) -> Option<Instant> {
        self.entries.first_key_value().map(|(key, _)| key.due)
    }

    /// Remove and return the earliest task if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<ScheduledTask> {
        match self.peek_due() {
            Some(due) if due <= now => self.entries.pop_first().map(|(_, task)| task),
            _ => None,
        }
    }

    /// Remove every task selected by `selector` and hand them back.
    ///
    /// The caller drops the returned tasks, typically after releasing the
    /// queue lock, since dropping an action runs arbitrary destructors.
    pub fn cancel(&mut self, selector: TagMatch<'_>) -> Vec<ScheduledTask> {
        if selector == TagMatch::All {
            return self.drain();
        }

        let keys: Vec<TaskKey> = self
            .entries
            .iter()
            .filter(|(_, task)| selector.matches(task.tag()))
            .map(|(key, _)| *key)
            .collect();

        keys.iter()
            .filter_map(|key| self.entries.remove(key))
            .collect()
    }

    /// Remove every task, in due order.
    pub fn drain(&mut self) -> Vec<ScheduledTask> {
        std::mem::take(&mut self.entries).into_values().collect()
    }

    /// Number of pending tasks.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is pending.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate pending tasks in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledTask> {
        self.entries.values()
    }
}
