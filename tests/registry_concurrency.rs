//! Concurrency properties of the registry and its meters

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tally::{
    Clock, Counter, DistributionConfig, LongTaskTimer, ManualClock, Meter, MeterFilters, MeterId,
    MeterKind, MeterRegistry, RegistryConfig, SystemClock, Tags, TimeUnit, Timer,
};

fn manual_registry() -> (Arc<ManualClock>, MeterRegistry) {
    let clock = Arc::new(ManualClock::new());
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    (clock, MeterRegistry::with_clock(RegistryConfig::default(), dyn_clock))
}

#[test]
fn test_three_concurrent_increments() {
    let registry = MeterRegistry::new();

    std::thread::scope(|scope| {
        for _ in 0..3 {
            scope.spawn(|| {
                registry
                    .counter("requests.total", [("service", "checkout")])
                    .unwrap()
                    .increment();
            });
        }
    });

    let counter = registry
        .find("requests.total")
        .tag("service", "checkout")
        .counter()
        .unwrap();
    assert_eq!(counter.count(), 3.0);
}

#[test]
fn test_increments_are_never_lost() {
    let registry = MeterRegistry::new();
    let counter = registry.counter("bytes.sent", Tags::empty()).unwrap();

    std::thread::scope(|scope| {
        for worker in 0..8 {
            let counter = counter.clone();
            scope.spawn(move || {
                for _ in 0..1_000 {
                    counter.increment_by(worker as f64 + 0.5);
                }
            });
        }
    });

    // sum over workers of (w + 0.5) * 1000
    assert_eq!(counter.count(), 32_000.0);
}

#[test]
fn test_concurrent_registration_yields_one_instance() {
    let registry = MeterRegistry::new();
    let constructions = AtomicUsize::new(0);
    let id = MeterId::new("pool.acquire", MeterKind::Timer, Tags::of([("pool", "db")])).unwrap();

    let meters: Vec<Meter> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..32)
            .map(|_| {
                scope.spawn(|| {
                    registry
                        .register_or_get(id.clone(), DistributionConfig::default(), |id, config| {
                            constructions.fetch_add(1, Ordering::SeqCst);
                            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
                            Meter::Timer(Timer::new(id, TimeUnit::Seconds, &config, clock))
                        })
                        .unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(constructions.load(Ordering::SeqCst), 1);
    assert!(meters.iter().all(|m| m.ptr_eq(&meters[0])));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_recording_while_publishing() {
    let (clock, registry) = manual_registry();
    let timer = Timer::builder("checkout")
        .publish_percentiles([0.5, 0.99])
        .register(&registry)
        .unwrap();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            let timer = timer.clone();
            scope.spawn(move || {
                for i in 0..500u64 {
                    timer.record(Duration::from_millis(1 + i % 50));
                }
            });
        }
        scope.spawn(|| {
            for _ in 0..50 {
                let snapshot = registry.snapshot();
                assert!(snapshot.len() <= 1);
                clock.add(Duration::from_millis(10));
            }
        });
    });

    assert_eq!(timer.count(), 2_000);
    assert!(timer.max(TimeUnit::Milliseconds) <= 50.0);
}

#[test]
fn test_long_task_timer_start_twice_stop_once() {
    let (clock, registry) = manual_registry();
    let ltt = LongTaskTimer::builder("import.batch").register(&registry).unwrap();

    let first = ltt.start();
    let second = ltt.start();
    clock.add(Duration::from_secs(3));

    assert!(first.stop().is_some());
    assert_eq!(ltt.active_tasks(), 1);

    assert!(second.stop().is_some());
    assert!(second.stop().is_none());
    assert_eq!(ltt.active_tasks(), 0);

    let snapshot = ltt.snapshot();
    assert_eq!(snapshot.completed_nanos.count, 2);
    assert_eq!(snapshot.completed_nanos.total, 6e9);
}

#[test]
fn test_denied_meter_is_noop_and_hidden() {
    let registry = MeterRegistry::new();
    registry.add_filter(MeterFilters::deny_name_matching(r"debug\..*").unwrap());

    let counter: Counter = registry.counter("debug.internal", Tags::empty()).unwrap();
    counter.increment();

    assert!(counter.is_noop());
    assert_eq!(registry.iter().count(), 0);
    assert!(registry.find("debug.internal").meter().is_none());
}

#[test]
fn test_negative_timer_recording_is_ignored() {
    let (_clock, registry) = manual_registry();
    let timer = registry.timer("db.query", Tags::empty()).unwrap();
    timer.record(Duration::from_millis(10));

    let before = timer.snapshot();
    timer.record_with_unit(-1.0, TimeUnit::Seconds);
    let after = timer.snapshot();

    assert_eq!(before, after);
    assert_eq!(after.count(), 1);
}

#[test]
fn test_empty_timer_reports_no_percentiles() {
    let (_clock, registry) = manual_registry();
    let timer = Timer::builder("idle")
        .publish_percentiles([0.5, 0.95])
        .register(&registry)
        .unwrap();

    let snapshot = timer.snapshot();
    assert_eq!(snapshot.count(), 0);
    assert_eq!(snapshot.total_time(TimeUnit::Seconds), 0.0);
    assert_eq!(snapshot.percentile(0.5, TimeUnit::Seconds), None);
    assert_eq!(snapshot.percentile(0.95, TimeUnit::Seconds), None);
}
