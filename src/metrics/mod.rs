//! Request Metrics
//!
//! Per-endpoint request statistics built from raw timer samples.
//!
//! ```text
//! RequestTimers ──▶ StatsAggregator ──▶ StatsTable ◀── export gauges
//!  (raw source)      (fixed delay)       (shared)        │
//!                          │                             │
//!                          └──▶ MetricKeyRegistry ───────┘
//!                               (register once per key)
//! ```

mod aggregator;
mod registry;
mod stats;
mod timers;

pub use aggregator::{AggregatorConfig, CycleReport, StatsAggregator};
pub use registry::{
    MetricKey, MetricKeyRegistry, API_REQUEST_AVG_SECONDS, API_REQUEST_COUNT,
    API_REQUEST_MAX_SECONDS,
};
pub use stats::{ApiStatsEntry, StatsTable};
pub use timers::{RequestTimer, RequestTimers, TimerId, TAG_STATUS};
