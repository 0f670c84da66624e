//! Tests for the meter instruments

use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::clock::{Clock, ManualClock};
use crate::config::RegistryConfig;
use crate::histogram::DistributionConfig;
use crate::meter::{MeterId, MeterKind, Tags};
use crate::time_unit::TimeUnit;

fn id(name: &str, kind: MeterKind) -> MeterId {
    MeterId::new(name, kind, Tags::empty()).unwrap()
}

fn manual_clock() -> (Arc<ManualClock>, Arc<dyn Clock>) {
    let clock = Arc::new(ManualClock::new());
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    (clock, dyn_clock)
}

fn timer(clock: Arc<dyn Clock>, config: DistributionConfig) -> Timer {
    let config = config.merge(&DistributionConfig::timer_defaults(&RegistryConfig::default()));
    Timer::new(id("http.requests", MeterKind::Timer), TimeUnit::Seconds, &config, clock)
}

// ========================================================================
// Counter Tests
// ========================================================================

#[test]
fn test_counter_increments() {
    let counter = Counter::new(id("jobs.processed", MeterKind::Counter));
    counter.increment();
    counter.increment_by(2.5);
    assert_eq!(counter.count(), 3.5);
}

#[test]
fn test_counter_rejects_negative_and_nan() {
    let counter = Counter::new(id("jobs.processed", MeterKind::Counter));
    counter.increment_by(-1.0);
    counter.increment_by(f64::NAN);
    counter.increment_by(f64::INFINITY);
    assert_eq!(counter.count(), 0.0);
}

#[test]
fn test_counter_clones_share_state() {
    let counter = Counter::new(id("jobs.processed", MeterKind::Counter));
    let clone = counter.clone();
    clone.increment();
    assert_eq!(counter.count(), 1.0);
    assert!(counter.ptr_eq(&clone));
}

#[test]
fn test_concurrent_counter_increments() {
    let counter = Counter::new(id("jobs.processed", MeterKind::Counter));
    std::thread::scope(|scope| {
        for _ in 0..8 {
            scope.spawn(|| {
                for _ in 0..1_000 {
                    counter.increment();
                }
            });
        }
    });
    assert_eq!(counter.count(), 8_000.0);
}

#[test]
fn test_noop_counter_ignores_increments() {
    let counter = Counter::noop(id("debug.hits", MeterKind::Counter));
    counter.increment();
    assert!(counter.is_noop());
    assert_eq!(counter.count(), 0.0);
}

// ========================================================================
// Gauge Tests
// ========================================================================

#[test]
fn test_gauge_reads_owner_through_weak_reference() {
    let queue = Arc::new(parking_lot::Mutex::new(vec![1, 2, 3]));
    let source = Gauge::weak_source(&queue, |q| q.lock().len() as f64);
    let gauge = Gauge::new(id("queue.size", MeterKind::Gauge), source);

    assert_eq!(gauge.value(), Some(3.0));
    queue.lock().push(4);
    assert_eq!(gauge.value(), Some(4.0));

    drop(queue);
    assert_eq!(gauge.value(), None);
}

#[test]
fn test_gauge_does_not_keep_owner_alive() {
    let owner = Arc::new(7u32);
    let _gauge = Gauge::new(
        id("owner.value", MeterKind::Gauge),
        Gauge::weak_source(&owner, |v| *v as f64),
    );
    assert_eq!(Arc::strong_count(&owner), 1);
}

#[test]
fn test_gauge_nan_reports_no_value() {
    let gauge = Gauge::new(
        id("ratio", MeterKind::Gauge),
        Gauge::fn_source(|| f64::NAN),
    );
    assert_eq!(gauge.value(), None);
}

#[test]
fn test_noop_gauge() {
    let gauge = Gauge::noop(id("ratio", MeterKind::Gauge));
    assert!(gauge.is_noop());
    assert_eq!(gauge.value(), None);
}

// ========================================================================
// Timer Tests
// ========================================================================

#[test]
fn test_timer_records_durations() {
    let (_clock, clock) = manual_clock();
    let timer = timer(clock, DistributionConfig::default());

    timer.record(Duration::from_millis(100));
    timer.record(Duration::from_millis(300));

    assert_eq!(timer.count(), 2);
    assert!((timer.total_time(TimeUnit::Milliseconds) - 400.0).abs() < 1e-9);
    assert!((timer.mean(TimeUnit::Milliseconds) - 200.0).abs() < 1e-9);
    assert!((timer.max(TimeUnit::Seconds) - 0.3).abs() < 1e-9);
}

#[test]
fn test_timer_rejects_negative_amounts() {
    let (_clock, clock) = manual_clock();
    let timer = timer(clock, DistributionConfig::default());

    timer.record_with_unit(-5.0, TimeUnit::Milliseconds);
    timer.record_with_unit(f64::NAN, TimeUnit::Milliseconds);
    assert_eq!(timer.count(), 0);

    timer.record_with_unit(5.0, TimeUnit::Milliseconds);
    assert_eq!(timer.count(), 1);
    assert!((timer.total_time(TimeUnit::Nanoseconds) - 5e6).abs() < 1e-3);
}

#[test]
fn test_timer_guard_records_once() {
    let (manual, clock) = manual_clock();
    let timer = timer(clock, DistributionConfig::default());

    let guard = timer.start();
    manual.add(Duration::from_millis(250));
    let elapsed = guard.stop();

    assert_eq!(elapsed, Duration::from_millis(250));
    assert_eq!(timer.count(), 1);
}

#[test]
fn test_timer_guard_records_on_drop() {
    let (manual, clock) = manual_clock();
    let timer = timer(clock, DistributionConfig::default());
    {
        let _guard = timer.start();
        manual.add(Duration::from_millis(10));
    }
    assert_eq!(timer.count(), 1);
    assert!((timer.total_time(TimeUnit::Milliseconds) - 10.0).abs() < 1e-9);
}

#[test]
fn test_timer_record_fn_returns_result() {
    let (manual, clock) = manual_clock();
    let timer = timer(clock, DistributionConfig::default());

    let value = timer.record_fn(|| {
        manual.add(Duration::from_millis(3));
        42
    });
    assert_eq!(value, 42);
    assert_eq!(timer.count(), 1);
}

#[test]
fn test_timer_record_fn_records_when_closure_panics() {
    let (manual, clock) = manual_clock();
    let timer = timer(clock, DistributionConfig::default());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        timer.record_fn(|| {
            manual.add(Duration::from_millis(7));
            panic!("operation failed");
        })
    }));

    assert!(result.is_err());
    assert_eq!(timer.count(), 1);
    assert!((timer.total_time(TimeUnit::Milliseconds) - 7.0).abs() < 1e-9);
}

#[test]
fn test_timer_guard_records_when_scope_unwinds() {
    let (manual, clock) = manual_clock();
    let timer = timer(clock, DistributionConfig::default());

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _guard = timer.start();
        manual.add(Duration::from_millis(4));
        panic!("handler failed");
    }));

    assert!(result.is_err());
    assert_eq!(timer.count(), 1);
}

#[test]
fn test_timer_sample_stops_into_any_timer() {
    let (manual, clock) = manual_clock();
    let timer = timer(clock.clone(), DistributionConfig::default());

    let sample = TimerSample::start(clock);
    manual.add(Duration::from_secs(2));
    assert_eq!(sample.stop(&timer), Duration::from_secs(2));
    assert!((timer.total_time(TimeUnit::Seconds) - 2.0).abs() < 1e-9);
}

#[test]
fn test_timer_snapshot_converts_units() {
    let (_clock, clock) = manual_clock();
    let timer = timer(
        clock,
        DistributionConfig::default().with_service_level_objectives([
            Duration::from_millis(100).as_nanos() as f64,
        ]),
    );
    timer.record(Duration::from_millis(50));
    timer.record(Duration::from_millis(150));

    let snapshot = timer.snapshot();
    assert_eq!(snapshot.count(), 2);
    assert!((snapshot.max(TimeUnit::Milliseconds) - 150.0).abs() < 1e-9);

    let seconds = snapshot.in_base_unit();
    assert!((seconds.total - 0.2).abs() < 1e-9);
    assert_eq!(seconds.count_at(0.1), Some(1));
}

#[test]
fn test_timer_max_decays_but_total_does_not() {
    let (manual, clock) = manual_clock();
    let timer = timer(clock, DistributionConfig::default());

    timer.record(Duration::from_secs(1));
    manual.add(Duration::from_secs(600));

    assert_eq!(timer.max(TimeUnit::Seconds), 0.0);
    assert_eq!(timer.count(), 1);
    assert!((timer.total_time(TimeUnit::Seconds) - 1.0).abs() < 1e-9);
}

#[test]
fn test_idle_timer_reports_zero_window_statistics() {
    let (manual, clock) = manual_clock();
    let timer = timer(clock, DistributionConfig::default().with_percentiles([0.5]));

    timer.record(Duration::from_millis(10));
    let live = timer.snapshot();
    assert_eq!(live.window_count(), 1);
    assert!((live.window_total_time(TimeUnit::Milliseconds) - 10.0).abs() < 1e-9);

    manual.add(Duration::from_secs(600));
    let idle = timer.snapshot();
    assert_eq!(idle.window_count(), 0);
    assert_eq!(idle.window_total_time(TimeUnit::Milliseconds), 0.0);
    assert_eq!(idle.max(TimeUnit::Milliseconds), 0.0);
    assert_eq!(idle.percentile(0.5, TimeUnit::Milliseconds), None);
    assert_eq!(idle.count(), 1);
}

#[test]
fn test_noop_timer_discards_recordings() {
    let timer = Timer::noop(id("debug.latency", MeterKind::Timer));
    timer.record(Duration::from_secs(1));
    timer.start().stop();
    assert!(timer.is_noop());
    assert_eq!(timer.count(), 0);
    assert_eq!(timer.snapshot().count(), 0);
}

// ========================================================================
// Distribution Summary Tests
// ========================================================================

fn summary(scale: f64) -> DistributionSummary {
    let (_clock, clock) = manual_clock();
    let config = DistributionConfig::summary_defaults(&RegistryConfig::default());
    DistributionSummary::new(
        id("payload.size", MeterKind::DistributionSummary),
        scale,
        &config,
        clock,
    )
}

#[test]
fn test_summary_records_amounts() {
    let summary = summary(1.0);
    summary.record(10.0);
    summary.record(30.0);

    assert_eq!(summary.count(), 2);
    assert_eq!(summary.total_amount(), 40.0);
    assert_eq!(summary.mean(), 20.0);
    assert_eq!(summary.max(), 30.0);
}

#[test]
fn test_summary_applies_scale() {
    let summary = summary(0.5);
    summary.record(10.0);
    assert_eq!(summary.total_amount(), 5.0);
    assert_eq!(summary.max(), 5.0);
}

#[test]
fn test_summary_negative_scale_leaves_no_state() {
    let summary = summary(-1.0);
    summary.record(5.0);

    assert_eq!(summary.count(), 0);
    assert_eq!(summary.total_amount(), 0.0);
    assert_eq!(summary.max(), 0.0);
    assert_eq!(summary.snapshot().window_count, 0);
}

#[test]
fn test_summary_nan_scale_never_poisons_total() {
    let summary = summary(f64::NAN);
    summary.record(5.0);
    summary.record(7.0);

    assert_eq!(summary.count(), 0);
    assert_eq!(summary.total_amount(), 0.0);
}

#[test]
fn test_summary_rejects_negative() {
    let summary = summary(1.0);
    summary.record(-1.0);
    summary.record(f64::NAN);
    assert_eq!(summary.count(), 0);
    assert_eq!(summary.snapshot().count, 0);
}

// ========================================================================
// Long Task Timer Tests
// ========================================================================

fn long_task_timer(clock: Arc<dyn Clock>) -> LongTaskTimer {
    let config = DistributionConfig::timer_defaults(&RegistryConfig::default());
    LongTaskTimer::new(
        id("batch.jobs", MeterKind::LongTaskTimer),
        TimeUnit::Seconds,
        &config,
        clock,
    )
}

#[test]
fn test_long_task_timer_tracks_active_tasks() {
    let (manual, clock) = manual_clock();
    let ltt = long_task_timer(clock);

    let first = ltt.start();
    manual.add(Duration::from_secs(10));
    let second = ltt.start();
    manual.add(Duration::from_secs(5));

    assert_eq!(ltt.active_tasks(), 2);
    assert_eq!(ltt.longest_active(), Duration::from_secs(15));
    assert_eq!(ltt.active_duration(), Duration::from_secs(20));
    assert_eq!(second.duration(), Some(Duration::from_secs(5)));

    assert_eq!(first.stop(), Some(Duration::from_secs(15)));
    assert_eq!(ltt.active_tasks(), 1);
    assert_eq!(ltt.longest_active(), Duration::from_secs(5));
}

#[test]
fn test_long_task_stop_is_idempotent() {
    let (manual, clock) = manual_clock();
    let ltt = long_task_timer(clock);

    let first = ltt.start();
    let second = ltt.start();
    manual.add(Duration::from_secs(1));
    assert!(first.stop().is_some());
    assert_eq!(ltt.active_tasks(), 1);

    assert!(first.stop().is_none());
    assert!(ltt.stop(&second).is_some());
    assert_eq!(ltt.active_tasks(), 0);
    assert_eq!(ltt.completed_count(), 2);
    assert!(!second.is_active());
    assert_eq!(second.duration(), None);
}

#[test]
fn test_long_task_sample_from_other_timer_is_ignored() {
    let (_manual, clock) = manual_clock();
    let a = long_task_timer(clock.clone());
    let b = long_task_timer(clock);

    let sample = a.start();
    assert_eq!(b.stop(&sample), None);
    assert_eq!(a.active_tasks(), 1);
}

#[test]
fn test_long_task_snapshot() {
    let (manual, clock) = manual_clock();
    let ltt = long_task_timer(clock);

    let done = ltt.start();
    manual.add(Duration::from_secs(2));
    done.stop();
    let _running = ltt.start();
    manual.add(Duration::from_secs(3));

    let snapshot = ltt.snapshot();
    assert_eq!(snapshot.active_tasks, 1);
    assert_eq!(snapshot.longest_active(TimeUnit::Seconds), 3.0);
    assert_eq!(snapshot.completed_nanos.count, 1);
    assert_eq!(snapshot.completed_nanos.total, 2e9);
}

#[test]
fn test_empty_long_task_timer() {
    let (_manual, clock) = manual_clock();
    let ltt = long_task_timer(clock);
    assert_eq!(ltt.active_tasks(), 0);
    assert_eq!(ltt.longest_active(), Duration::ZERO);
    assert_eq!(ltt.active_duration(), Duration::ZERO);
}

#[test]
fn test_noop_long_task_timer() {
    let ltt = LongTaskTimer::noop(id("debug.jobs", MeterKind::LongTaskTimer));
    let sample = ltt.start();
    assert_eq!(ltt.active_tasks(), 0);
    assert_eq!(sample.stop(), None);
}
