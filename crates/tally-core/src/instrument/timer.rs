//! Timer - latency distribution of short events

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::histogram::{DecayingHistogram, DistributionConfig, HistogramSnapshot};
use crate::meter::MeterId;
use crate::time_unit::TimeUnit;
use crate::util::AtomicF64;

/// Timer handle.
///
/// Durations are stored in nanoseconds; `base_unit` is only the unit readings
/// are reported in. Count and total time cover the timer's lifetime, max and
/// percentiles decay with the histogram window.
#[derive(Clone)]
pub struct Timer {
    inner: Arc<TimerInner>,
}

struct TimerInner {
    id: MeterId,
    base_unit: TimeUnit,
    clock: Arc<dyn Clock>,
    count: AtomicU64,
    total_nanos: AtomicF64,
    histogram: Option<DecayingHistogram>,
}

impl Timer {
    /// Standalone timer; the registry normally builds these through [`Timer::builder`]
    pub fn new(
        id: MeterId,
        base_unit: TimeUnit,
        config: &DistributionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let histogram = DecayingHistogram::new(config, clock.clone());
        Self::build(id, base_unit, clock, Some(histogram))
    }

    /// A timer that discards every recording
    pub fn noop(id: MeterId) -> Self {
        Self::build(id, TimeUnit::default(), Arc::new(SystemClock), None)
    }

    fn build(
        id: MeterId,
        base_unit: TimeUnit,
        clock: Arc<dyn Clock>,
        histogram: Option<DecayingHistogram>,
    ) -> Self {
        Self {
            inner: Arc::new(TimerInner {
                id,
                base_unit,
                clock,
                count: AtomicU64::new(0),
                total_nanos: AtomicF64::default(),
                histogram,
            }),
        }
    }

    pub fn id(&self) -> &MeterId {
        &self.inner.id
    }

    pub fn is_noop(&self) -> bool {
        self.inner.histogram.is_none()
    }

    pub fn base_unit(&self) -> TimeUnit {
        self.inner.base_unit
    }

    /// Record a completed duration
    pub fn record(&self, duration: Duration) {
        self.record_nanos(duration.as_nanos() as f64);
    }

    /// Record `amount` expressed in `unit`; negative or non-finite amounts are ignored
    pub fn record_with_unit(&self, amount: f64, unit: TimeUnit) {
        if !amount.is_finite() || amount < 0.0 {
            tracing::trace!(meter = %self.inner.id, amount, "rejected negative timer recording");
            return;
        }
        self.record_nanos(unit.to_nanos(amount));
    }

    fn record_nanos(&self, nanos: f64) {
        let Some(histogram) = &self.inner.histogram else {
            return;
        };
        self.inner.count.fetch_add(1, Ordering::Relaxed);
        self.inner.total_nanos.fetch_add(nanos);
        histogram.record(nanos);
    }

    /// Time `f`; the duration is recorded even if `f` unwinds
    pub fn record_fn<T>(&self, f: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        f()
    }

    /// Start timing; the guard records once, on `stop` or on drop
    pub fn start(&self) -> TimerGuard {
        TimerGuard {
            timer: self.clone(),
            start_nanos: self.inner.clock.monotonic_nanos(),
            stopped: false,
        }
    }

    pub fn count(&self) -> u64 {
        self.inner.count.load(Ordering::Relaxed)
    }

    pub fn total_time(&self, unit: TimeUnit) -> f64 {
        unit.from_nanos(self.inner.total_nanos.load())
    }

    /// Decaying max over the histogram window
    pub fn max(&self, unit: TimeUnit) -> f64 {
        let nanos = self.inner.histogram.as_ref().map_or(0.0, DecayingHistogram::max);
        unit.from_nanos(nanos)
    }

    pub fn mean(&self, unit: TimeUnit) -> f64 {
        match self.count() {
            0 => 0.0,
            count => self.total_time(unit) / count as f64,
        }
    }

    pub fn snapshot(&self) -> TimerSnapshot {
        let count = self.count();
        let total = self.inner.total_nanos.load();
        let histogram = match &self.inner.histogram {
            Some(histogram) => histogram.snapshot(count, total),
            None => HistogramSnapshot::empty(),
        };
        TimerSnapshot {
            base_unit: self.inner.base_unit,
            nanos: histogram,
        }
    }

    /// Whether both handles point at the same timer
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.inner.id)
            .field("base_unit", &self.inner.base_unit)
            .field("count", &self.count())
            .field("noop", &self.is_noop())
            .finish()
    }
}

/// In-flight timing started by [`Timer::start`]
#[must_use = "dropping the guard immediately records a near-zero duration"]
pub struct TimerGuard {
    timer: Timer,
    start_nanos: u64,
    stopped: bool,
}

impl TimerGuard {
    /// Time since the guard was created
    pub fn elapsed(&self) -> Duration {
        let now = self.timer.inner.clock.monotonic_nanos();
        Duration::from_nanos(now.saturating_sub(self.start_nanos))
    }

    /// Stop timing and record the elapsed duration
    pub fn stop(mut self) -> Duration {
        self.finish()
    }

    fn finish(&mut self) -> Duration {
        let elapsed = self.elapsed();
        if !self.stopped {
            self.stopped = true;
            self.timer.record(elapsed);
        }
        elapsed
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Start time captured independently of any timer.
///
/// Useful when the timer's tags are only known once the work completes.
#[derive(Clone)]
pub struct TimerSample {
    clock: Arc<dyn Clock>,
    start_nanos: u64,
}

impl TimerSample {
    pub fn start(clock: Arc<dyn Clock>) -> Self {
        let start_nanos = clock.monotonic_nanos();
        Self { clock, start_nanos }
    }

    /// Record the elapsed time into `timer`
    pub fn stop(self, timer: &Timer) -> Duration {
        let now = self.clock.monotonic_nanos();
        let elapsed = Duration::from_nanos(now.saturating_sub(self.start_nanos));
        timer.record(elapsed);
        elapsed
    }
}

impl fmt::Debug for TimerSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerSample")
            .field("start_nanos", &self.start_nanos)
            .finish()
    }
}

/// Timer statistics, held in nanoseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimerSnapshot {
    pub base_unit: TimeUnit,
    pub nanos: HistogramSnapshot,
}

impl TimerSnapshot {
    pub fn count(&self) -> u64 {
        self.nanos.count
    }

    pub fn total_time(&self, unit: TimeUnit) -> f64 {
        unit.from_nanos(self.nanos.total)
    }

    /// Observations in the trailing window
    pub fn window_count(&self) -> u64 {
        self.nanos.window_count
    }

    pub fn window_total_time(&self, unit: TimeUnit) -> f64 {
        unit.from_nanos(self.nanos.window_total)
    }

    pub fn max(&self, unit: TimeUnit) -> f64 {
        unit.from_nanos(self.nanos.max)
    }

    pub fn mean(&self, unit: TimeUnit) -> f64 {
        unit.from_nanos(self.nanos.mean())
    }

    pub fn percentile(&self, percentile: f64, unit: TimeUnit) -> Option<f64> {
        self.nanos
            .percentile(percentile)
            .map(|nanos| unit.from_nanos(nanos))
    }

    /// Every value converted to the timer's base unit
    pub fn in_base_unit(&self) -> HistogramSnapshot {
        self.nanos.scaled_down(self.base_unit.nanos_per_unit())
    }
}
