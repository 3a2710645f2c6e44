//! Polling helpers for work performed on other threads.

use std::thread;
use std::time::{Duration, Instant};

/// Default upper bound for [`wait_until`] in tests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default polling interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2);

/// Poll `condition` until it holds or `timeout` elapses.
///
/// Returns the final value of `condition`.
///
/// ```rust
/// use ioutil_test_helpers::wait_until;
/// use std::time::Duration;
///
/// assert!(wait_until(Duration::from_millis(50), || true));
/// ```
pub fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        thread::sleep(DEFAULT_POLL_INTERVAL);
    }
    condition()
}

/// Sleep long enough for in-flight work to finish before a negative check.
pub fn settle(duration: Duration) {
    thread::sleep(duration);
}
