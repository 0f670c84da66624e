//! Meter instruments
//!
//! Handles are cheap to clone and share their state; the registry hands out
//! clones of the instance it owns. Every instrument has a noop form returned
//! when a filter denies registration.

mod counter;
mod gauge;
mod long_task_timer;
mod summary;
mod timer;

#[cfg(test)]
mod tests;

pub use counter::Counter;
pub use gauge::{Gauge, GaugeFn};
pub use long_task_timer::{LongTaskSample, LongTaskTimer, LongTaskTimerSnapshot};
pub use summary::DistributionSummary;
pub use timer::{Timer, TimerGuard, TimerSample, TimerSnapshot};
