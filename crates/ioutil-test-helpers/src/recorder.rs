//! Thread-safe recorders for observing closures run by a task queue.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Records values in the order closures observed them.
///
/// Clones share the same log.
///
/// ```rust
/// use ioutil_test_helpers::CallRecorder;
///
/// let recorder = CallRecorder::new();
/// let sink = recorder.clone();
/// sink.record("a");
/// assert_eq!(recorder.snapshot(), vec!["a"]);
/// ```
#[derive(Debug)]
pub struct CallRecorder<T> {
    calls: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for CallRecorder<T> {
    fn clone(&self) -> Self {
        Self {
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<T> Default for CallRecorder<T> {
    fn default() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl<T: Clone> CallRecorder<T> {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a value.
    pub fn record(&self, value: T) {
        self.calls.lock().push(value);
    }

    /// Copy of everything recorded so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.calls.lock().clone()
    }

    /// Number of recorded values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Shared hit counter.
///
/// ```rust
/// use ioutil_test_helpers::HitCounter;
///
/// let hits = HitCounter::new();
/// let mut bump = hits.incrementer();
/// bump();
/// bump();
/// assert_eq!(hits.get(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct HitCounter {
    hits: Arc<AtomicUsize>,
}

impl HitCounter {
    /// Create a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one.
    pub fn hit(&self) {
        self.hits.fetch_add(1, Ordering::SeqCst);
    }

    /// Current count.
    #[must_use]
    pub fn get(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    /// A `'static` closure that increments this counter.
    #[must_use]
    pub fn incrementer(&self) -> impl FnMut() + Send + 'static {
        let counter = self.clone();
        move || counter.hit()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_recorder_shared_between_threads() {
        let recorder = CallRecorder::new();
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let sink = recorder.clone();
                thread::spawn(move || sink.record(i))
            })
            .collect();
        for handle in handles {
            assert!(handle.join().is_ok());
        }

        let mut calls = recorder.snapshot();
        calls.sort_unstable();
        assert_eq!(calls, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_hit_counter_incrementer() {
        let hits = HitCounter::new();
        let mut bump = hits.incrementer();
        bump();
        assert_eq!(hits.get(), 1);
    }
}
