//! Gauge - value read from an external source on demand

use std::fmt;
use std::sync::Arc;

use crate::meter::MeterId;

/// Function producing the current gauge value, `None` once the source is gone
pub type GaugeFn = Box<dyn Fn() -> Option<f64> + Send + Sync>;

/// Gauge handle.
///
/// A gauge stores nothing; each read evaluates its source. When the source is
/// an object, only a weak reference is kept, so the gauge never keeps the
/// object alive and reports no value once it has been dropped.
#[derive(Clone)]
pub struct Gauge {
    inner: Arc<GaugeInner>,
}

struct GaugeInner {
    id: MeterId,
    source: Option<GaugeFn>,
}

impl Gauge {
    /// Standalone gauge over `source`
    pub fn new(id: MeterId, source: GaugeFn) -> Self {
        Self {
            inner: Arc::new(GaugeInner {
                id,
                source: Some(source),
            }),
        }
    }

    /// A gauge that never reports a value
    pub fn noop(id: MeterId) -> Self {
        Self {
            inner: Arc::new(GaugeInner { id, source: None }),
        }
    }

    /// Observe `owner` through a weak reference
    pub(crate) fn weak_source<T, F>(owner: &Arc<T>, value_fn: F) -> GaugeFn
    where
        T: Send + Sync + 'static,
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        let weak = Arc::downgrade(owner);
        Box::new(move || weak.upgrade().map(|owner| value_fn(&owner)))
    }

    /// Source without an owner; always alive
    pub(crate) fn fn_source<F>(value_fn: F) -> GaugeFn
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Box::new(move || Some(value_fn()))
    }

    pub fn id(&self) -> &MeterId {
        &self.inner.id
    }

    pub fn is_noop(&self) -> bool {
        self.inner.source.is_none()
    }

    /// Evaluate the source; NaN and a dropped owner both yield `None`
    pub fn value(&self) -> Option<f64> {
        self.inner
            .source
            .as_ref()
            .and_then(|source| source())
            .filter(|value| !value.is_nan())
    }

    /// Whether both handles point at the same gauge
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge")
            .field("id", &self.inner.id)
            .field("noop", &self.is_noop())
            .finish()
    }
}
