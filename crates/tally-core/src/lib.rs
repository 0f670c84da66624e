//! Tally Core Library
//!
//! This crate provides the meter registry and statistical aggregation engine
//! behind tally: dimensional meter identities, counters, gauges, timers,
//! distribution summaries and long task timers, the decaying histogram that
//! backs their percentiles, registration-time filters, and the publisher
//! contract backends build on.

pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod histogram;
pub mod instrument;
pub mod meter;
pub mod publish;
pub mod registry;
pub mod time_unit;
mod util;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RegistryConfig;
pub use error::{TallyError, TallyResult};
pub use filter::{MeterFilter, MeterFilterReply, MeterFilters};
pub use histogram::{
    CountAtBucket, DecayingHistogram, DistributionConfig, HistogramSnapshot, ValueAtPercentile,
};
pub use instrument::{
    Counter, DistributionSummary, Gauge, LongTaskSample, LongTaskTimer, LongTaskTimerSnapshot,
    Timer, TimerGuard, TimerSample, TimerSnapshot,
};
pub use meter::{
    Measurement, Meter, MeterId, MeterKind, MeterSnapshot, MeterValue, RegistrySnapshot,
    Statistic, Tag, Tags,
};
pub use publish::{LoggingPublisher, PublishLoop, Publisher};
pub use registry::{
    CounterBuilder, DistributionSummaryBuilder, GaugeBuilder, LongTaskTimerBuilder, MeterRegistry,
    Search, TimerBuilder, global_registry,
};
pub use time_unit::TimeUnit;
