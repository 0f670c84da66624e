//! Counter - monotonically increasing total

use std::fmt;
use std::sync::Arc;

use crate::meter::MeterId;
use crate::util::AtomicF64;

/// Counter handle (monotonically increasing).
///
/// Clones share the same accumulator.
#[derive(Clone)]
pub struct Counter {
    inner: Arc<CounterInner>,
}

struct CounterInner {
    id: MeterId,
    count: AtomicF64,
    noop: bool,
}

impl Counter {
    /// Standalone counter; register through a [`MeterRegistry`](crate::registry::MeterRegistry) to share it
    pub fn new(id: MeterId) -> Self {
        Self::build(id, false)
    }

    /// A counter that ignores every increment
    pub fn noop(id: MeterId) -> Self {
        Self::build(id, true)
    }

    fn build(id: MeterId, noop: bool) -> Self {
        Self {
            inner: Arc::new(CounterInner {
                id,
                count: AtomicF64::default(),
                noop,
            }),
        }
    }

    pub fn id(&self) -> &MeterId {
        &self.inner.id
    }

    pub fn is_noop(&self) -> bool {
        self.inner.noop
    }

    /// Increment by 1
    pub fn increment(&self) {
        self.increment_by(1.0);
    }

    /// Increment by `amount`; negative or non-finite amounts are ignored
    pub fn increment_by(&self, amount: f64) {
        if self.inner.noop {
            return;
        }
        if !amount.is_finite() || amount < 0.0 {
            tracing::trace!(meter = %self.inner.id, amount, "rejected counter increment");
            return;
        }
        self.inner.count.fetch_add(amount);
    }

    /// Get current total
    pub fn count(&self) -> f64 {
        self.inner.count.load()
    }

    /// Whether both handles point at the same accumulator
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("id", &self.inner.id)
            .field("count", &self.count())
            .field("noop", &self.inner.noop)
            .finish()
    }
}
