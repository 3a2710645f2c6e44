//! Lock-free queue counters.
//!
//! Counters use `Ordering::Relaxed`; they are observational and never used
//! to synchronize with queue state.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of a queue's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct QueueStats {
    /// Tasks accepted by `enqueue`.
    pub enqueued: u64,
    /// Tasks that ran to completion.
    pub executed: u64,
    /// Tasks whose action panicked.
    pub panicked: u64,
    /// Pending tasks removed by `cancel`.
    pub cancelled: u64,
    /// Tasks discarded unexecuted at shutdown.
    pub abandoned: u64,
    /// Enqueues refused because the queue was full.
    pub rejected_full: u64,
    /// Enqueues refused because a `wait()` was draining the queue.
    pub rejected_draining: u64,
    /// Enqueues refused because the queue was stopped.
    pub rejected_stopped: u64,
}

impl QueueStats {
    /// Total number of refused enqueues.
    #[must_use]
    pub fn rejected(&self) -> u64 {
        self.rejected_full
            .saturating_add(self.rejected_draining)
            .saturating_add(self.rejected_stopped)
    }
}

#[derive(Debug, Default)]
pub(crate) struct QueueCounters {
    enqueued: AtomicU64,
    executed: AtomicU64,
    panicked: AtomicU64,
    cancelled: AtomicU64,
    abandoned: AtomicU64,
    rejected_full: AtomicU64,
    rejected_draining: AtomicU64,
    rejected_stopped: AtomicU64,
}

impl QueueCounters {
    #[inline]
    pub(crate) fn inc_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_executed(&self) {
        self.executed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_panicked(&self) {
        self.panicked.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_cancelled(&self, count: usize) {
        self.cancelled.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn add_abandoned(&self, count: usize) {
        self.abandoned.fetch_add(count as u64, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_rejected_full(&self) {
        self.rejected_full.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_rejected_draining(&self) {
        self.rejected_draining.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn inc_rejected_stopped(&self) {
        self.rejected_stopped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> QueueStats {
        QueueStats {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            executed: self.executed.load(Ordering::Relaxed),
            panicked: self.panicked.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            abandoned: self.abandoned.load(Ordering::Relaxed),
            rejected_full: self.rejected_full.load(Ordering::Relaxed),
            rejected_draining: self.rejected_draining.load(Ordering::Relaxed),
            rejected_stopped: self.rejected_stopped.load(Ordering::Relaxed),
        }
    }
}
