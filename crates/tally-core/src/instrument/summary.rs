//! Distribution summary - size distribution of events

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::clock::Clock;
use crate::histogram::{DecayingHistogram, DistributionConfig, HistogramSnapshot};
use crate::meter::MeterId;
use crate::util::AtomicF64;

/// Distribution summary handle.
///
/// Recorded amounts are multiplied by `scale` before they reach any statistic.
#[derive(Clone)]
pub struct DistributionSummary {
    inner: Arc<SummaryInner>,
}

struct SummaryInner {
    id: MeterId,
    scale: f64,
    count: AtomicU64,
    total: AtomicF64,
    histogram: Option<DecayingHistogram>,
}

impl DistributionSummary {
    pub fn new(
        id: MeterId,
        scale: f64,
        config: &DistributionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::build(id, scale, Some(DecayingHistogram::new(config, clock)))
    }

    /// A summary that discards every recording
    pub fn noop(id: MeterId) -> Self {
        Self::build(id, 1.0, None)
    }

    fn build(id: MeterId, scale: f64, histogram: Option<DecayingHistogram>) -> Self {
        Self {
            inner: Arc::new(SummaryInner {
                id,
                scale,
                count: AtomicU64::new(0),
                total: AtomicF64::default(),
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

    pub fn scale(&self) -> f64 {
        self.inner.scale
    }

    /// Record one event; amounts that are negative or non-finite once scaled are ignored
    pub fn record(&self, amount: f64) {
        let Some(histogram) = &self.inner.histogram else {
            return;
        };
        let scaled = amount * self.inner.scale;
        if !scaled.is_finite() || scaled < 0.0 {
            tracing::trace!(meter = %self.inner.id, amount, scaled, "rejected summary recording");
            return;
        }
        self.inner.count.fetch_add(1, Ordering::Relaxed);
        self.inner.total.fetch_add(scaled);
        histogram.record(scaled);
    }

    pub fn count(&self) -> u64 {
        self.inner.count.load(Ordering::Relaxed)
    }

    pub fn total_amount(&self) -> f64 {
        self.inner.total.load()
    }

    /// Decaying max over the histogram window
    pub fn max(&self) -> f64 {
        self.inner
            .histogram
            .as_ref()
            .map_or(0.0, DecayingHistogram::max)
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            count => self.total_amount() / count as f64,
        }
    }

    pub fn snapshot(&self) -> HistogramSnapshot {
        match &self.inner.histogram {
            Some(histogram) => histogram.snapshot(self.count(), self.total_amount()),
            None => HistogramSnapshot::empty(),
        }
    }

    /// Whether both handles point at the same summary
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for DistributionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributionSummary")
            .field("id", &self.inner.id)
            .field("count", &self.count())
            .field("total", &self.total_amount())
            .finish()
    }
}
