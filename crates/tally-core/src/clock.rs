//! Time sources injected into every time-sensitive component

use once_cell::sync::Lazy;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of wall-clock and monotonic time.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn wall_time_millis(&self) -> u64;

    /// Nanoseconds on a monotonic timeline with an arbitrary origin
    fn monotonic_nanos(&self) -> u64;
}

static PROCESS_ANCHOR: Lazy<Instant> = Lazy::new(Instant::now);

/// Clock backed by the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn wall_time_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn monotonic_nanos(&self) -> u64 {
        PROCESS_ANCHOR.elapsed().as_nanos() as u64
    }
}

/// Clock that only moves when told to; used to drive window rotation deterministically.
#[derive(Debug, Default)]
pub struct ManualClock {
    wall_millis: AtomicU64,
    monotonic: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance both timelines by `step`.
    pub fn add(&self, step: Duration) {
        self.monotonic
            .fetch_add(step.as_nanos() as u64, Ordering::SeqCst);
        self.wall_millis
            .fetch_add(step.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_monotonic_nanos(&self, nanos: u64) {
        self.monotonic.store(nanos, Ordering::SeqCst);
    }

    pub fn set_wall_time_millis(&self, millis: u64) {
        self.wall_millis.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn wall_time_millis(&self) -> u64 {
        self.wall_millis.load(Ordering::SeqCst)
    }

    fn monotonic_nanos(&self) -> u64 {
        self.monotonic.load(Ordering::SeqCst)
    }
}
