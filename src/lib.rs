//! Tally - vendor-neutral instrumentation facade
//!
//! Record counts, gauges, timings and value distributions against named,
//! tagged meters, then hand point-in-time snapshots to any number of
//! publishers.
//!
//! ```
//! use tally::{MeterRegistry, Tags};
//!
//! let registry = MeterRegistry::new();
//! let requests = registry.counter("requests.total", [("service", "checkout")]).unwrap();
//! requests.increment();
//! assert_eq!(requests.count(), 1.0);
//! ```

pub use tally_core::*;

/// HTTP tag helpers
pub use tally_http as http;
