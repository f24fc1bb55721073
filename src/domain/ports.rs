//! Domain Ports (Port/Adapter Pattern)
//!
//! Trait seams for every collaborator the sampling core talks to. The core
//! never reaches for a concrete registry, OS API or network client; adapters
//! in [`crate::adapters`] and [`crate::metrics::RequestTimers`] implement these.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Sampling Core                          │
//! │  MetricKeyRegistry │ StatsAggregator │ TrendBuffer │ Monitor │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Ports (Traits)                         │
//! │  SampleSource │ ResourceSource │ ExportSink │ AlertNotifier  │
//! │  DependencyProbe │ ConnectionPool                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// =============================================================================
// Well-known names
// =============================================================================

/// Timer name under which per-request samples are recorded.
pub const HTTP_SERVER_REQUESTS: &str = "http.server.requests";

/// Tag carrying the HTTP method on request timers.
pub const TAG_METHOD: &str = "method";

/// Tag carrying the matched route on request timers.
pub const TAG_URI: &str = "uri";

/// Process CPU utilisation gauge, as a 0.0 - 1.0 ratio.
pub const CPU_USAGE: &str = "cpu.usage";

/// Live thread count gauge.
pub const THREADS_LIVE: &str = "threads.live";

/// Cumulative garbage-collection pause timer.
pub const GC_PAUSE: &str = "gc.pause";

/// Memory area tag value for heap regions.
pub const AREA_HEAP: &str = "heap";

// =============================================================================
// Raw Sample Source
// =============================================================================

/// Cumulative reading of one timer.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TimerSample {
    /// Number of recorded events
    pub count: u64,
    /// Sum of all recorded durations
    pub total_time: Duration,
    /// Largest single recorded duration
    pub max: Duration,
}

/// One timer identity held by a [`SampleSource`].
pub trait TimerHandle: Send + Sync {
    /// Look up a tag value on the timer's identity.
    fn tag(&self, key: &str) -> Option<String>;

    /// Read the timer's cumulative values.
    fn sample(&self) -> Result<TimerSample>;
}

/// Port for the raw per-request measurement source.
///
/// Several timers may share one (method, uri) pair, for instance when they
/// differ by status code; consumers merge them.
pub trait SampleSource: Send + Sync {
    /// All timers currently registered under `name`.
    fn timers(&self, name: &str) -> Result<Vec<Arc<dyn TimerHandle>>>;
}

// =============================================================================
// Resource-Usage Source
// =============================================================================

/// Which side of a memory region to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryMeasure {
    /// Bytes currently in use
    Used,
    /// Upper bound the region may grow to
    Max,
}

/// One memory region reading.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryRegion {
    /// Area tag (`heap`, `nonheap`, ...)
    pub area: String,
    /// Region identifier
    pub id: String,
    /// Size in bytes
    pub bytes: f64,
}

impl MemoryRegion {
    pub fn new(area: impl Into<String>, id: impl Into<String>, bytes: f64) -> Self {
        Self {
            area: area.into(),
            id: id.into(),
            bytes,
        }
    }
}

/// Port for process resource-usage readings.
///
/// `Ok(None)` means the source has no such meter; `Err` means the read failed.
pub trait ResourceSource: Send + Sync {
    /// Current value of a named scalar gauge.
    fn gauge(&self, name: &str) -> Result<Option<f64>>;

    /// Cumulative total of a named timer.
    fn timer_total(&self, name: &str) -> Result<Option<Duration>>;

    /// All memory regions for the requested measure.
    fn memory_regions(&self, measure: MemoryMeasure) -> Result<Vec<MemoryRegion>>;
}

// =============================================================================
// Export Sink
// =============================================================================

/// Value callback evaluated each time the sink is scraped.
pub type GaugeFn = Box<dyn Fn() -> f64 + Send + Sync>;

/// Identity of an exported gauge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GaugeSpec {
    /// Metric name
    pub name: String,
    /// Help text
    pub help: String,
    /// Single identifying tag (key, value)
    pub tag: (String, String),
}

impl GaugeSpec {
    pub fn new(
        name: impl Into<String>,
        help: impl Into<String>,
        tag_key: impl Into<String>,
        tag_value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            tag: (tag_key.into(), tag_value.into()),
        }
    }
}

/// Port for pull-based gauge export.
pub trait ExportSink: Send + Sync {
    /// Register a callback-backed gauge.
    ///
    /// Idempotent per (name, tag): returns `Ok(false)` when the pair is
    /// already registered and leaves the existing callback in place.
    fn register_gauge(&self, spec: GaugeSpec, value: GaugeFn) -> Result<bool>;
}

// =============================================================================
// Notification
// =============================================================================

/// Port for delivering alert messages.
#[async_trait]
pub trait AlertNotifier: Send + Sync {
    /// Deliver one formatted alert.
    async fn notify(&self, message: String) -> Result<()>;
}

// =============================================================================
// Dependency Probes
// =============================================================================

/// One availability check against an external dependency.
///
/// Probes never fail: every transport problem maps to `false`.
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    /// Short protocol label used in logs.
    fn protocol(&self) -> &'static str;

    /// Returns `true` when the dependency is available.
    async fn probe(&self) -> bool;
}

/// A connection leased from a [`ConnectionPool`].
///
/// Dropping the lease returns the connection to its pool.
#[async_trait]
pub trait PooledConnection: Send {
    /// Whether the underlying connection is open and usable.
    async fn is_open(&mut self) -> Result<bool>;
}

/// Port for a pooled connection source (for instance a database).
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Lease one connection.
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>>;
}
