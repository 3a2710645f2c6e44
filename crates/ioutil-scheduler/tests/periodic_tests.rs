//! Behavioural tests for `PeriodicTask`.

use ioutil_scheduler::prelude::*;
use ioutil_test_helpers::assert_sorted;
use ioutil_test_helpers::prelude::*;
use std::panic;
use std::thread;
use std::time::{Duration, Instant};

const INTERVAL: Duration = Duration::from_millis(20);

#[test]
fn test_fires_repeatedly_at_interval() -> TestResult {
    init_test_tracing();
    let queue = TaskQueue::unbounded()?;
    let fired_at = CallRecorder::new();

    let sink = fired_at.clone();
    let task = PeriodicTask::new(&queue, INTERVAL, move || sink.record(Instant::now()))?;

    assert!(wait_until(DEFAULT_TIMEOUT, || fired_at.len() >= 5));
    task.stop();
    queue.wait();

    let times = fired_at.snapshot();
    assert_sorted!(&times);
    for pair in times.windows(2) {
        if let [earlier, later] = pair {
            assert!(
                later.duration_since(*earlier) >= INTERVAL,
                "invocations closer than the interval: {:?}",
                later.duration_since(*earlier)
            );
        }
    }
    assert_eq!(task.invocations(), times.len() as u64);
    Ok(())
}

#[test]
fn test_cadence_within_a_fixed_window() -> TestResult {
    const WINDOW: Duration = Duration::from_millis(200);
    let queue = TaskQueue::unbounded()?;
    let hits = HitCounter::new();

    let task = PeriodicTask::new(&queue, INTERVAL, hits.incrementer())?;
    settle(WINDOW);
    let in_window = hits.get();

    let expected = (WINDOW.as_millis() / INTERVAL.as_millis()) as usize - 1;
    assert!(
        in_window >= expected,
        "only {in_window} invocations in {WINDOW:?}, expected at least {expected}"
    );

    drop(task);
    queue.wait();
    let after_drop = hits.get();
    settle(Duration::from_millis(100));
    assert_eq!(hits.get(), after_drop);
    Ok(())
}

#[test]
fn test_panicking_action_keeps_its_schedule() -> TestResult {
    init_test_tracing();
    let queue = TaskQueue::unbounded()?;
    let hits = HitCounter::new();

    let counter = hits.clone();
    let task = PeriodicTask::new(&queue, INTERVAL, move || {
        counter.hit();
        if counter.get() == 1 {
            panic::panic_any("first tick fails");
        }
    })?;

    assert!(
        wait_until(DEFAULT_TIMEOUT, || hits.get() > 3),
        "periodic task stopped firing after a panic"
    );
    assert!(!task.is_stopped());
    assert!(task.invocations() >= 3);
    assert_eq!(queue.stats().panicked, 0);
    assert!(!queue.is_stopped());
    Ok(())
}

#[test]
fn test_panicking_action_under_propagate_stops_everything() -> TestResult {
    init_test_tracing();
    let config = TaskQueueConfig::builder()
        .panic_policy(PanicPolicy::Propagate)
        .build()?;
    let queue = TaskQueue::with_config(config)?;

    let task = PeriodicTask::new(&queue, INTERVAL, || {
        panic::panic_any("periodic failure under test");
    })?;

    assert!(wait_until(DEFAULT_TIMEOUT, || queue.is_stopped()));
    assert!(task.is_stopped());
    assert_eq!(task.invocations(), 1);
    Ok(())
}

#[test]
fn test_stop_under_fast_cadence_leaves_nothing_pending() -> TestResult {
    let queue = TaskQueue::unbounded()?;

    for round in 0..20_u64 {
        let hits = HitCounter::new();
        let task = PeriodicTask::new(&queue, Duration::from_millis(1), hits.incrementer())?;
        settle(Duration::from_millis(round % 5));
        task.stop();

        assert!(queue.wait_timeout(Duration::from_secs(1)));
        assert!(queue.is_empty(), "round {round} left a resubmission behind");
        let stopped_at = hits.get();
        settle(Duration::from_millis(5));
        assert_eq!(hits.get(), stopped_at);
    }
    Ok(())
}

#[test]
fn test_first_run_waits_one_interval() -> TestResult {
    let queue = TaskQueue::unbounded()?;
    let hits = HitCounter::new();
    let task = PeriodicTask::new(&queue, Duration::from_millis(200), hits.incrementer())?;

    settle(Duration::from_millis(50));
    assert_eq!(hits.get(), 0);
    assert_eq!(task.invocations(), 0);
    Ok(())
}

#[test]
fn test_no_invocations_after_drop() -> TestResult {
    let queue = TaskQueue::unbounded()?;
    let hits = HitCounter::new();

    {
        let _task = PeriodicTask::new(&queue, INTERVAL, hits.incrementer())?;
        assert!(wait_until(DEFAULT_TIMEOUT, || hits.get() >= 2));
    }
    queue.wait();

    let after_drop = hits.get();
    settle(Duration::from_millis(100));
    assert_eq!(hits.get(), after_drop);
    assert!(queue.is_empty());
    Ok(())
}

#[test]
fn test_stop_while_running_lets_invocation_finish() -> TestResult {
    let queue = TaskQueue::unbounded()?;
    let hits = HitCounter::new();

    let counter = hits.clone();
    let task = PeriodicTask::new(&queue, INTERVAL, move || {
        thread::sleep(Duration::from_millis(40));
        counter.hit();
    })?;

    assert!(wait_until(DEFAULT_TIMEOUT, || queue.is_running()));
    task.stop();
    queue.wait();

    let finished = hits.get();
    assert!(finished >= 1);
    settle(Duration::from_millis(100));
    assert_eq!(hits.get(), finished);
    assert_eq!(task.invocations(), finished as u64);
    assert!(queue.is_empty());
    Ok(())
}

#[test]
fn test_runs_on_the_queue_worker() -> TestResult {
    let config = TaskQueueConfig::builder().thread_name("rolling-file").build()?;
    let queue = TaskQueue::with_config(config)?;
    let names = CallRecorder::new();

    let sink = names.clone();
    let task = PeriodicTask::new(&queue, INTERVAL, move || {
        sink.record(thread::current().name().map(str::to_owned));
    })?;
    assert!(wait_until(DEFAULT_TIMEOUT, || names.len() >= 2));
    drop(task);
    queue.wait();

    for name in names.snapshot() {
        assert_eq!(name.as_deref(), Some("rolling-file"));
    }
    Ok(())
}

#[test]
fn test_sustained_backpressure_runs_inline_then_gives_up() -> TestResult {
    init_test_tracing();
    let queue = TaskQueue::new(Capacity::bounded(1)?)?;
    let handle = queue.handle();
    let hits = HitCounter::new();
    let refused = HitCounter::new();

    // Every invocation takes the only slot before the task can resubmit.
    let counter = hits.clone();
    let refusals = refused.clone();
    let config = PeriodicConfig::new(INTERVAL).with_max_bypass_runs(2);
    let task = PeriodicTask::with_config(&queue, config, move || {
        counter.hit();
        if handle
            .enqueue(Duration::from_secs(10), Some("filler"), || {})
            .is_err()
        {
            refusals.hit();
        }
    })?;

    assert!(wait_until(DEFAULT_TIMEOUT, || task.is_stopped()));

    assert_eq!(task.invocations(), 3);
    assert_eq!(hits.get(), 3);
    assert_eq!(refused.get(), 2);
    assert_eq!(queue.len(), 1);
    assert_eq!(queue.cancel("filler"), 1);
    Ok(())
}

#[test]
fn test_zero_bypass_budget_gives_up_immediately() -> TestResult {
    let queue = TaskQueue::new(Capacity::bounded(1)?)?;
    let handle = queue.handle();

    let config = PeriodicConfig::new(INTERVAL).with_max_bypass_runs(0);
    let task = PeriodicTask::with_config(&queue, config, move || {
        if handle.enqueue(Duration::from_secs(10), Some("filler"), || {}).is_err() {
            tracing::debug!("filler refused");
        }
    })?;

    assert!(wait_until(DEFAULT_TIMEOUT, || task.is_stopped()));
    assert_eq!(task.invocations(), 1);
    Ok(())
}

#[test]
fn test_queue_shutdown_ends_periodic_task() -> TestResult {
    let queue = TaskQueue::unbounded()?;
    let task = PeriodicTask::new(&queue, INTERVAL, || {
        thread::sleep(Duration::from_millis(30));
    })?;

    assert!(wait_until(DEFAULT_TIMEOUT, || queue.is_running()));
    queue.shutdown();

    assert!(task.is_stopped());
    assert_eq!(task.invocations(), 1);
    assert!(queue.is_empty());
    Ok(())
}

#[test]
fn test_independent_tasks_share_one_queue() -> TestResult {
    let queue = TaskQueue::unbounded()?;
    let fast = HitCounter::new();
    let slow = HitCounter::new();

    let fast_task = PeriodicTask::new(&queue, Duration::from_millis(10), fast.incrementer())?;
    let slow_task = PeriodicTask::new(&queue, Duration::from_millis(60), slow.incrementer())?;
    assert_eq!(queue.len(), 2);

    assert!(wait_until(DEFAULT_TIMEOUT, || slow.get() >= 2));
    assert!(fast.get() > slow.get());

    slow_task.stop();
    assert!(!fast_task.is_stopped());
    assert!(wait_until(DEFAULT_TIMEOUT, || queue.len() == 1));
    Ok(())
}

#[test]
fn test_debug_output_names_the_task() -> TestResult {
    let queue = TaskQueue::unbounded()?;
    let task = PeriodicTask::new(&queue, Duration::from_secs(60), || {})?;

    let rendered = format!("{task:?}");
    assert!(rendered.contains(task.tag()));
    assert!(rendered.contains("invocations: 0"));
    Ok(())
}
