//! Fixed ring of time-windowed buckets

use parking_lot::RwLock;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::clock::Clock;

/// A bucket that can be cleared when it is recycled as the current window.
pub(crate) trait WindowBucket: Send + Sync {
    fn reset(&self);
}

#[derive(Debug)]
struct Cursor {
    current: usize,
    window_end: u64,
}

/// `N` preallocated buckets, one of which is current at any instant.
///
/// Writers record into the current bucket under a shared lock; rotation takes
/// the exclusive lock, so a write racing a rotation lands in the bucket that is
/// current once the rotation finishes. Rotation catches up any number of
/// elapsed windows in one step and is a no-op while the window is still open.
pub(crate) struct TimeWindowRing<B> {
    clock: Arc<dyn Clock>,
    buckets: Box<[B]>,
    window_nanos: u64,
    cursor: RwLock<Cursor>,
    window_end: AtomicU64,
}

impl<B: WindowBucket> TimeWindowRing<B> {
    pub fn new(
        clock: Arc<dyn Clock>,
        expiry: Duration,
        buffer_length: usize,
        make_bucket: impl FnMut() -> B,
    ) -> Self {
        let buffer_length = buffer_length.max(1);
        let window_nanos = ((expiry.as_nanos() / buffer_length as u128) as u64).max(1);
        let buckets: Box<[B]> = std::iter::repeat_with(make_bucket)
            .take(buffer_length)
            .collect();
        let window_end = clock.monotonic_nanos().saturating_add(window_nanos);

        Self {
            clock,
            buckets,
            window_nanos,
            cursor: RwLock::new(Cursor {
                current: 0,
                window_end,
            }),
            window_end: AtomicU64::new(window_end),
        }
    }

    /// Run `f` against the current bucket
    pub fn record<R>(&self, f: impl FnOnce(&B) -> R) -> R {
        self.rotate();
        let cursor = self.cursor.read();
        f(&self.buckets[cursor.current])
    }

    /// Run `f` against every live bucket; no bucket is recycled while `f` runs
    pub fn read<R>(&self, f: impl FnOnce(&[B]) -> R) -> R {
        self.rotate();
        let _cursor = self.cursor.read();
        f(&self.buckets)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn window(&self) -> Duration {
        Duration::from_nanos(self.window_nanos)
    }

    fn rotate(&self) {
        let now = self.clock.monotonic_nanos();
        if now < self.window_end.load(Ordering::Acquire) {
            return;
        }

        let mut cursor = self.cursor.write();
        if now < cursor.window_end {
            return;
        }

        let elapsed_windows = (now - cursor.window_end) / self.window_nanos + 1;
        let steps = elapsed_windows.min(self.buckets.len() as u64);
        for _ in 0..steps {
            cursor.current = (cursor.current + 1) % self.buckets.len();
            self.buckets[cursor.current].reset();
        }
        cursor.window_end = cursor
            .window_end
            .saturating_add(elapsed_windows.saturating_mul(self.window_nanos));
        self.window_end.store(cursor.window_end, Ordering::Release);
    }
}
