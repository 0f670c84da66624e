//! Long task timer - tracks tasks while they are still running

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::clock::{Clock, SystemClock};
use crate::histogram::{DecayingHistogram, DistributionConfig, HistogramSnapshot};
use crate::meter::MeterId;
use crate::time_unit::TimeUnit;
use crate::util::AtomicF64;

/// Long task timer handle.
///
/// Each `start` registers an active task keyed by a sequence number, so the
/// oldest active task is always the first map entry. Stopping a task removes
/// it and feeds its duration into the completed-task statistics.
#[derive(Clone)]
pub struct LongTaskTimer {
    inner: Arc<LongTaskInner>,
}

struct LongTaskInner {
    id: MeterId,
    base_unit: TimeUnit,
    clock: Arc<dyn Clock>,
    next_task: AtomicU64,
    // task -> monotonic start
    active: Mutex<BTreeMap<u64, u64>>,
    completed_count: AtomicU64,
    completed_nanos: AtomicF64,
    histogram: Option<DecayingHistogram>,
}

impl LongTaskTimer {
    pub fn new(
        id: MeterId,
        base_unit: TimeUnit,
        config: &DistributionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let histogram = DecayingHistogram::new(config, clock.clone());
        Self::build(id, base_unit, clock, Some(histogram))
    }

    /// A long task timer that never tracks anything
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
            inner: Arc::new(LongTaskInner {
                id,
                base_unit,
                clock,
                next_task: AtomicU64::new(1),
                active: Mutex::new(BTreeMap::new()),
                completed_count: AtomicU64::new(0),
                completed_nanos: AtomicF64::default(),
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

    /// Register a new active task
    pub fn start(&self) -> LongTaskSample {
        if self.is_noop() {
            return LongTaskSample {
                timer: self.clone(),
                task: 0,
            };
        }
        // Sequence and start time are taken under the lock so map order matches start order
        let mut active = self.inner.active.lock();
        let task = self.inner.next_task.fetch_add(1, Ordering::Relaxed);
        active.insert(task, self.inner.clock.monotonic_nanos());
        LongTaskSample {
            timer: self.clone(),
            task,
        }
    }

    /// Stop a task started by this timer.
    ///
    /// Returns the task's duration, or `None` if it was already stopped or
    /// belongs to another timer.
    pub fn stop(&self, sample: &LongTaskSample) -> Option<Duration> {
        if !self.ptr_eq(&sample.timer) {
            return None;
        }
        let start = self.inner.active.lock().remove(&sample.task)?;
        let nanos = self.inner.clock.monotonic_nanos().saturating_sub(start);

        self.inner.completed_count.fetch_add(1, Ordering::Relaxed);
        self.inner.completed_nanos.fetch_add(nanos as f64);
        if let Some(histogram) = &self.inner.histogram {
            histogram.record(nanos as f64);
        }
        Some(Duration::from_nanos(nanos))
    }

    pub fn active_tasks(&self) -> usize {
        self.inner.active.lock().len()
    }

    /// Running time of the oldest active task
    pub fn longest_active(&self) -> Duration {
        let now = self.inner.clock.monotonic_nanos();
        let active = self.inner.active.lock();
        active
            .first_key_value()
            .map_or(Duration::ZERO, |(_, &start)| {
                Duration::from_nanos(now.saturating_sub(start))
            })
    }

    /// Sum of running times of all active tasks
    pub fn active_duration(&self) -> Duration {
        let now = self.inner.clock.monotonic_nanos();
        let active = self.inner.active.lock();
        let nanos = active
            .values()
            .map(|&start| now.saturating_sub(start))
            .fold(0u64, u64::saturating_add);
        Duration::from_nanos(nanos)
    }

    /// Number of tasks that have been stopped
    pub fn completed_count(&self) -> u64 {
        self.inner.completed_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> LongTaskTimerSnapshot {
        let count = self.completed_count();
        let total = self.inner.completed_nanos.load();
        let completed_nanos = match &self.inner.histogram {
            Some(histogram) => histogram.snapshot(count, total),
            None => HistogramSnapshot::empty(),
        };
        LongTaskTimerSnapshot {
            base_unit: self.inner.base_unit,
            active_tasks: self.active_tasks(),
            active_duration_nanos: self.active_duration().as_nanos() as u64,
            longest_active_nanos: self.longest_active().as_nanos() as u64,
            completed_nanos,
        }
    }

    /// Whether both handles point at the same timer
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for LongTaskTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongTaskTimer")
            .field("id", &self.inner.id)
            .field("active_tasks", &self.active_tasks())
            .field("completed", &self.completed_count())
            .finish()
    }
}

/// Handle to one active task
pub struct LongTaskSample {
    timer: LongTaskTimer,
    task: u64,
}

impl LongTaskSample {
    /// Stop the task; later calls return `None`
    pub fn stop(&self) -> Option<Duration> {
        self.timer.stop(self)
    }

    /// Current running time, `None` once stopped
    pub fn duration(&self) -> Option<Duration> {
        let now = self.timer.inner.clock.monotonic_nanos();
        let active = self.timer.inner.active.lock();
        active
            .get(&self.task)
            .map(|&start| Duration::from_nanos(now.saturating_sub(start)))
    }

    pub fn is_active(&self) -> bool {
        self.timer.inner.active.lock().contains_key(&self.task)
    }
}

impl fmt::Debug for LongTaskSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LongTaskSample")
            .field("meter", self.timer.id())
            .field("task", &self.task)
            .finish()
    }
}

/// Long task timer statistics; completed tasks are held in nanoseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongTaskTimerSnapshot {
    pub base_unit: TimeUnit,
    pub active_tasks: usize,
    pub active_duration_nanos: u64,
    pub longest_active_nanos: u64,
    pub completed_nanos: HistogramSnapshot,
}

impl LongTaskTimerSnapshot {
    pub fn active_duration(&self, unit: TimeUnit) -> f64 {
        unit.from_nanos(self.active_duration_nanos as f64)
    }

    pub fn longest_active(&self, unit: TimeUnit) -> f64 {
        unit.from_nanos(self.longest_active_nanos as f64)
    }
}
