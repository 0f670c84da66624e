//! Floating point atomics built on `AtomicU64` bit storage

use std::sync::atomic::{AtomicU64, Ordering};

/// An `f64` that can be updated concurrently without locks.
///
/// Additions and maxima are applied through a compare-and-swap loop, so
/// concurrent updates are never lost.
#[derive(Debug, Default)]
pub struct AtomicF64 {
    bits: AtomicU64,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn load(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::Acquire))
    }

    pub fn store(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::Release);
    }

    /// Add `delta` and return the previous value.
    pub fn fetch_add(&self, delta: f64) -> f64 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + delta).to_bits();
            match self
                .bits
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(prev) => return f64::from_bits(prev),
                Err(actual) => current = actual,
            }
        }
    }

    /// Raise the stored value to `value` if it is larger.
    pub fn fetch_max(&self, value: f64) -> f64 {
        let mut current = self.bits.load(Ordering::Relaxed);
        loop {
            let stored = f64::from_bits(current);
            if stored >= value {
                return stored;
            }
            match self.bits.compare_exchange_weak(
                current,
                value.to_bits(),
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return stored,
                Err(actual) => current = actual,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_fetch_add() {
        let value = AtomicF64::new(1.5);
        assert_eq!(value.fetch_add(2.0), 1.5);
        assert_eq!(value.load(), 3.5);
    }

    #[test]
    fn test_fetch_max_only_raises() {
        let value = AtomicF64::default();
        value.fetch_max(4.0);
        value.fetch_max(2.0);
        assert_eq!(value.load(), 4.0);
    }

    #[test]
    fn test_concurrent_adds_are_not_lost() {
        let value = Arc::new(AtomicF64::default());
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let value = value.clone();
                scope.spawn(move || {
                    for _ in 0..1_000 {
                        value.fetch_add(1.0);
                    }
                });
            }
        });
        assert_eq!(value.load(), 8_000.0);
    }
}
