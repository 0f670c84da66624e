//! Decaying histogram and percentile engine
//!
//! This module provides the statistics shared by timers, distribution
//! summaries and long task timers:
//! - A rolling ring of time-windowed buckets that ages out old observations
//! - Cumulative counts for fixed boundaries (SLAs, percentile histograms)
//! - Client-side percentile estimation from a log-linear sketch
//! - A decaying maximum over the same trailing window

mod buckets;
mod config;
mod ring;
mod sketch;
mod snapshot;


pub use buckets::percentile_histogram_buckets;
pub use config::DistributionConfig;
pub use snapshot::{CountAtBucket, HistogramSnapshot, ValueAtPercentile};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::clock::Clock;
use crate::util::AtomicF64;
use ring::{TimeWindowRing, WindowBucket};
use sketch::SketchLayout;

const DEFAULT_EXPIRY: Duration = Duration::from_secs(120);
const DEFAULT_BUFFER_LENGTH: usize = 3;

struct HistogramBucket {
    count: AtomicU64,
    total: AtomicF64,
    max: AtomicF64,
    sketch: Box<[AtomicU64]>,
    fixed: Box<[AtomicU64]>,
}

impl HistogramBucket {
    fn new(sketch_len: usize, fixed_len: usize) -> Self {
        Self {
            count: AtomicU64::new(0),
            total: AtomicF64::default(),
            max: AtomicF64::default(),
            sketch: zeroed(sketch_len),
            fixed: zeroed(fixed_len),
        }
    }
}

impl WindowBucket for HistogramBucket {
    fn reset(&self) {
        self.count.store(0, Ordering::Relaxed);
        self.total.store(0.0);
        self.max.store(0.0);
        for slot in self.sketch.iter().chain(self.fixed.iter()) {
            slot.store(0, Ordering::Relaxed);
        }
    }
}

fn zeroed(len: usize) -> Box<[AtomicU64]> {
    std::iter::repeat_with(|| AtomicU64::new(0)).take(len).collect()
}

/// Time-decaying distribution statistics for a single meter.
///
/// Recording is lock-free apart from a shared read lock on the ring cursor;
/// nothing is allocated after construction.
pub struct DecayingHistogram {
    ring: TimeWindowRing<HistogramBucket>,
    boundaries: Box<[f64]>,
    percentiles: Box<[f64]>,
    sketch: Option<SketchLayout>,
}

impl DecayingHistogram {
    /// Build from a fully merged config
    pub fn new(config: &DistributionConfig, clock: Arc<dyn Clock>) -> Self {
        let boundaries: Box<[f64]> = config.histogram_boundaries().into();
        let percentiles: Box<[f64]> = config.valid_percentiles().into();
        let sketch = (!percentiles.is_empty()).then(|| {
            SketchLayout::new(
                config.minimum_expected_value.unwrap_or(1.0),
                config.maximum_expected_value.unwrap_or(u64::MAX as f64),
                config.percentile_precision.unwrap_or(1),
            )
        });
        let sketch_len = sketch.as_ref().map_or(0, SketchLayout::len);
        let fixed_len = boundaries.len();

        let ring = TimeWindowRing::new(
            clock,
            config.expiry.unwrap_or(DEFAULT_EXPIRY),
            config.buffer_length.unwrap_or(DEFAULT_BUFFER_LENGTH),
            || HistogramBucket::new(sketch_len, fixed_len),
        );

        Self {
            ring,
            boundaries,
            percentiles,
            sketch,
        }
    }

    /// Record one observation into the current window
    pub fn record(&self, value: f64) {
        let sketch_index = self.sketch.as_ref().map(|layout| layout.index_of(value));
        let fixed_index = self.boundaries.partition_point(|boundary| *boundary < value);

        self.ring.record(|bucket| {
            bucket.count.fetch_add(1, Ordering::Relaxed);
            bucket.total.fetch_add(value);
            bucket.max.fetch_max(value);
            if let Some(index) = sketch_index {
                bucket.sketch[index].fetch_add(1, Ordering::Relaxed);
            }
            if let Some(slot) = bucket.fixed.get(fixed_index) {
                slot.fetch_add(1, Ordering::Relaxed);
            }
        });
    }

    /// Largest value seen in the trailing window, 0 when empty
    pub fn max(&self) -> f64 {
        self.ring.read(|buckets| {
            buckets
                .iter()
                .map(|b| b.max.load())
                .fold(0.0, f64::max)
        })
    }

    /// Number of observations in the trailing window
    pub fn window_count(&self) -> u64 {
        self.ring.read(|buckets| {
            buckets
                .iter()
                .map(|b| b.count.load(Ordering::Relaxed))
                .sum()
        })
    }

    /// Sum of observations in the trailing window
    pub fn window_total(&self) -> f64 {
        self.ring
            .read(|buckets| buckets.iter().map(|b| b.total.load()).sum())
    }

    /// Duration of a single ring bucket
    pub fn window(&self) -> Duration {
        self.ring.window()
    }

    /// Number of ring buckets
    pub fn buffer_length(&self) -> usize {
        self.ring.len()
    }

    /// Take a snapshot; `count` and `total` are supplied by the owning meter
    pub fn snapshot(&self, count: u64, total: f64) -> HistogramSnapshot {
        self.ring.read(|buckets| {
            let max = buckets
                .iter()
                .map(|b| b.max.load())
                .fold(0.0, f64::max);
            let window_count = buckets
                .iter()
                .map(|b| b.count.load(Ordering::Relaxed))
                .sum();
            let window_total = buckets.iter().map(|b| b.total.load()).sum();

            let percentile_values = match &self.sketch {
                Some(layout) => {
                    let merged = merge_slots(buckets, layout.len(), |b| &b.sketch[..]);
                    self.percentiles
                        .iter()
                        .map(|&percentile| ValueAtPercentile {
                            percentile,
                            value: layout.value_at(&merged, percentile, max),
                        })
                        .collect()
                }
                None => Vec::new(),
            };

            let per_slot = merge_slots(buckets, self.boundaries.len(), |b| &b.fixed[..]);
            let mut cumulative = 0u64;
            let histogram_counts = self
                .boundaries
                .iter()
                .zip(per_slot)
                .map(|(&bucket, count)| {
                    cumulative += count;
                    CountAtBucket {
                        bucket,
                        count: cumulative,
                    }
                })
                .collect();

            HistogramSnapshot {
                count,
                total,
                window_count,
                window_total,
                max,
                percentile_values,
                histogram_counts,
            }
        })
    }
}

fn merge_slots(
    buckets: &[HistogramBucket],
    len: usize,
    slots: impl Fn(&HistogramBucket) -> &[AtomicU64],
) -> Vec<u64> {
    let mut merged = vec![0u64; len];
    for bucket in buckets {
        for (total, slot) in merged.iter_mut().zip(slots(bucket)) {
            *total += slot.load(Ordering::Relaxed);
        }
    }
    merged
}
