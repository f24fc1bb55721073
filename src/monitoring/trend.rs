//! 24-Hour Trend Buffer
//!
//! Fixed-capacity ring of samples per system signal. One value per signal is
//! appended on every tick; when a ring is full the oldest value is evicted
//! first. With the default 60s cadence and 1440 slots a ring holds one day.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::domain::ports::ResourceSource;
use crate::error::Result;
use crate::monitoring::system::{cpu_usage_percent, gc_pause_millis, live_threads, HeapUsage};
use crate::scheduler::PeriodicTask;

/// Default number of points per series (24h at one point per minute)
pub const TREND_CAPACITY: usize = 1440;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the trend buffer
#[derive(Debug, Clone)]
pub struct TrendConfig {
    /// Period between ticks
    pub interval: Duration,
    /// Points retained per series
    pub capacity: usize,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            capacity: TREND_CAPACITY,
        }
    }
}

// =============================================================================
// Signals
// =============================================================================

/// Tracked system signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrendSignal {
    CpuUsagePercent,
    HeapUsagePercent,
    LiveThreads,
    GcPauseMillis,
}

impl TrendSignal {
    pub const ALL: [TrendSignal; 4] = [
        TrendSignal::CpuUsagePercent,
        TrendSignal::HeapUsagePercent,
        TrendSignal::LiveThreads,
        TrendSignal::GcPauseMillis,
    ];

    /// Series name used in the query surface
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendSignal::CpuUsagePercent => "cpuUsagePercent",
            TrendSignal::HeapUsagePercent => "heapUsagePercent",
            TrendSignal::LiveThreads => "liveThreads",
            TrendSignal::GcPauseMillis => "gcPauseMillis",
        }
    }

    fn read(&self, source: &dyn ResourceSource) -> Result<Option<f64>> {
        match self {
            TrendSignal::CpuUsagePercent => cpu_usage_percent(source),
            TrendSignal::HeapUsagePercent => Ok(HeapUsage::read(source)?.percent()),
            TrendSignal::LiveThreads => live_threads(source),
            TrendSignal::GcPauseMillis => gc_pause_millis(source),
        }
    }
}

impl fmt::Display for TrendSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Series
// =============================================================================

/// Fixed-capacity FIFO of samples, oldest first
#[derive(Debug, Clone)]
pub struct TrendSeries {
    capacity: usize,
    values: VecDeque<f64>,
}

impl TrendSeries {
    /// Create an empty series. A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity),
        }
    }

    /// Append a value, evicting the oldest when full
    pub fn push(&mut self, value: f64) {
        if self.values.len() >= self.capacity {
            self.values.pop_front();
        }
        self.values.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Copy of the values, oldest first
    pub fn to_vec(&self) -> Vec<f64> {
        self.values.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }
}

// =============================================================================
// Buffer
// =============================================================================

/// Samples system signals into per-signal rings
pub struct TrendBuffer {
    config: TrendConfig,
    source: Arc<dyn ResourceSource>,
    series: BTreeMap<TrendSignal, Mutex<TrendSeries>>,
}

impl TrendBuffer {
    pub fn new(config: TrendConfig, source: Arc<dyn ResourceSource>) -> Self {
        let series = TrendSignal::ALL
            .iter()
            .map(|s| (*s, Mutex::new(TrendSeries::new(config.capacity))))
            .collect();
        Self {
            config,
            source,
            series,
        }
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Sample every signal once. Failed or missing readings record 0.0.
    #[instrument(skip(self))]
    pub fn tick(&self) {
        for (signal, series) in &self.series {
            let value = match signal.read(self.source.as_ref()) {
                Ok(Some(v)) if v.is_finite() => v,
                Ok(_) => 0.0,
                Err(e) => {
                    debug!("Trend read failed for {}: {}", signal, e);
                    0.0
                }
            };
            series.lock().push(value);
        }
    }

    /// Independent copy of every series keyed by signal name
    pub fn snapshot(&self) -> BTreeMap<String, Vec<f64>> {
        self.series
            .iter()
            .map(|(signal, series)| (signal.as_str().to_string(), series.lock().to_vec()))
            .collect()
    }

    /// Copy of one series
    pub fn series(&self, signal: TrendSignal) -> Vec<f64> {
        self.series
            .get(&signal)
            .map(|s| s.lock().to_vec())
            .unwrap_or_default()
    }
}

#[async_trait]
impl PeriodicTask for TrendBuffer {
    fn name(&self) -> &str {
        "trend-buffer"
    }

    async fn run(&self) {
        self.tick();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MemoryMeasure, MemoryRegion, CPU_USAGE, THREADS_LIVE};
    use crate::error::Error;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Reports an increasing thread count and fails every heap read.
    #[derive(Default)]
    struct StepSource {
        step: AtomicU64,
    }

    impl ResourceSource for StepSource {
        fn gauge(&self, name: &str) -> Result<Option<f64>> {
            match name {
                CPU_USAGE => Ok(Some(0.5)),
                THREADS_LIVE => Ok(Some(self.step.fetch_add(1, Ordering::SeqCst) as f64)),
                _ => Ok(None),
            }
        }

        fn timer_total(&self, _name: &str) -> Result<Option<Duration>> {
            Ok(None)
        }

        fn memory_regions(&self, _measure: MemoryMeasure) -> Result<Vec<MemoryRegion>> {
            Err(Error::source_read("memory", "unavailable"))
        }
    }

    fn buffer(capacity: usize) -> TrendBuffer {
        TrendBuffer::new(
            TrendConfig {
                interval: Duration::from_secs(60),
                capacity,
            },
            Arc::new(StepSource::default()),
        )
    }

    #[test]
    fn test_trend_config_default() {
        let config = TrendConfig::default();
        assert_eq!(config.capacity, 1440);
        assert_eq!(config.interval, Duration::from_secs(60));
    }

    #[test]
    fn test_series_evicts_oldest() {
        let mut series = TrendSeries::new(3);
        for v in 1..=5 {
            series.push(v as f64);
        }
        assert_eq!(series.to_vec(), vec![3.0, 4.0, 5.0]);
        assert_eq!(series.latest(), Some(5.0));
    }

    #[test]
    fn test_zero_capacity_holds_one() {
        let mut series = TrendSeries::new(0);
        series.push(1.0);
        series.push(2.0);
        assert_eq!(series.to_vec(), vec![2.0]);
    }

    #[test]
    fn test_tick_records_each_signal() {
        let buffer = buffer(10);
        buffer.tick();
        buffer.tick();

        let snapshot = buffer.snapshot();
        assert_eq!(snapshot.len(), 4);
        assert_eq!(snapshot["cpuUsagePercent"], vec![50.0, 50.0]);
        assert_eq!(snapshot["liveThreads"], vec![0.0, 1.0]);
        // Failed heap reads and absent GC timer both degrade to zero
        assert_eq!(snapshot["heapUsagePercent"], vec![0.0, 0.0]);
        assert_eq!(snapshot["gcPauseMillis"], vec![0.0, 0.0]);
    }

    #[test]
    fn test_capacity_plus_k_ticks_keeps_last_values() {
        let buffer = buffer(5);
        for _ in 0..8 {
            buffer.tick();
        }

        let threads = buffer.series(TrendSignal::LiveThreads);
        assert_eq!(threads, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_snapshot_is_independent_copy() {
        let buffer = buffer(10);
        buffer.tick();
        let before = buffer.snapshot();
        buffer.tick();

        assert_eq!(before["cpuUsagePercent"].len(), 1);
        assert_eq!(buffer.series(TrendSignal::CpuUsagePercent).len(), 2);
    }
}
