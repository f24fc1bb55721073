//! System Snapshot
//!
//! Point-in-time view of process resource usage. Every field degrades on its
//! own: a failed read turns that field into `None` (or 0.0 for the heap byte
//! totals) and the rest of the snapshot is still produced.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::ports::{
    MemoryMeasure, ResourceSource, AREA_HEAP, CPU_USAGE, GC_PAUSE, THREADS_LIVE,
};
use crate::error::Result;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Heap totals summed over every region tagged `heap`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HeapUsage {
    pub used_bytes: f64,
    pub max_bytes: f64,
}

impl HeapUsage {
    /// Sum all heap regions of the source.
    pub fn read(source: &dyn ResourceSource) -> Result<Self> {
        Ok(Self {
            used_bytes: heap_bytes(source, MemoryMeasure::Used)?,
            max_bytes: heap_bytes(source, MemoryMeasure::Max)?,
        })
    }

    /// `100 * used / max`, or `None` when `max` is not positive.
    pub fn percent(&self) -> Option<f64> {
        if self.max_bytes > 0.0 {
            Some(self.used_bytes / self.max_bytes * 100.0)
        } else {
            None
        }
    }

    pub fn used_mb(&self) -> f64 {
        self.used_bytes / BYTES_PER_MB
    }

    pub fn max_mb(&self) -> f64 {
        self.max_bytes / BYTES_PER_MB
    }
}

fn heap_bytes(source: &dyn ResourceSource, measure: MemoryMeasure) -> Result<f64> {
    Ok(source
        .memory_regions(measure)?
        .iter()
        .filter(|r| r.area == AREA_HEAP)
        .map(|r| r.bytes)
        .sum())
}

/// CPU utilisation as a percentage.
pub fn cpu_usage_percent(source: &dyn ResourceSource) -> Result<Option<f64>> {
    Ok(source.gauge(CPU_USAGE)?.map(|ratio| ratio * 100.0))
}

/// Live thread count.
pub fn live_threads(source: &dyn ResourceSource) -> Result<Option<f64>> {
    source.gauge(THREADS_LIVE)
}

/// Cumulative GC pause in milliseconds.
pub fn gc_pause_millis(source: &dyn ResourceSource) -> Result<Option<f64>> {
    Ok(source
        .timer_total(GC_PAUSE)?
        .map(|total| total.as_secs_f64() * 1000.0))
}

/// JSON shape served on the system-health endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSnapshot {
    pub cpu_usage_percent: Option<f64>,
    #[serde(rename = "heapUsedMB")]
    pub heap_used_mb: f64,
    #[serde(rename = "heapMaxMB")]
    pub heap_max_mb: f64,
    pub heap_usage_percent: Option<f64>,
    pub live_threads: Option<u64>,
    pub gc_pause_millis: Option<f64>,
}

impl SystemSnapshot {
    /// Read every field from `source`.
    pub fn capture(source: &dyn ResourceSource) -> Self {
        let heap = HeapUsage::read(source).unwrap_or_else(|e| {
            debug!("Heap read failed: {}", e);
            HeapUsage::default()
        });

        Self {
            cpu_usage_percent: degrade("cpu", cpu_usage_percent(source)),
            heap_used_mb: heap.used_mb(),
            heap_max_mb: heap.max_mb(),
            heap_usage_percent: heap.percent(),
            live_threads: degrade("threads", live_threads(source)).map(|t| t as u64),
            gc_pause_millis: degrade("gc", gc_pause_millis(source)),
        }
    }
}

fn degrade(field: &str, reading: Result<Option<f64>>) -> Option<f64> {
    reading.unwrap_or_else(|e| {
        debug!("{} read failed: {}", field, e);
        None
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MemoryRegion;
    use crate::error::Error;
    use std::time::Duration;

    const MB: f64 = 1024.0 * 1024.0;

    #[derive(Default)]
    struct FakeSource {
        used: Vec<MemoryRegion>,
        max: Vec<MemoryRegion>,
        fail_memory: bool,
        fail_gauges: bool,
    }

    impl ResourceSource for FakeSource {
        fn gauge(&self, name: &str) -> Result<Option<f64>> {
            if self.fail_gauges {
                return Err(Error::source_read(name, "boom"));
            }
            Ok(match name {
                CPU_USAGE => Some(0.25),
                THREADS_LIVE => Some(17.0),
                _ => None,
            })
        }

        fn timer_total(&self, _name: &str) -> Result<Option<Duration>> {
            Ok(Some(Duration::from_millis(1500)))
        }

        fn memory_regions(&self, measure: MemoryMeasure) -> Result<Vec<MemoryRegion>> {
            if self.fail_memory {
                return Err(Error::source_read("memory", "boom"));
            }
            Ok(match measure {
                MemoryMeasure::Used => self.used.clone(),
                MemoryMeasure::Max => self.max.clone(),
            })
        }
    }

    #[test]
    fn test_heap_percent_half() {
        let source = FakeSource {
            used: vec![MemoryRegion::new("heap", "eden", 512.0 * MB)],
            max: vec![MemoryRegion::new("heap", "eden", 1024.0 * MB)],
            ..Default::default()
        };

        let snapshot = SystemSnapshot::capture(&source);
        assert_eq!(snapshot.heap_usage_percent, Some(50.0));
        assert_eq!(snapshot.heap_used_mb, 512.0);
        assert_eq!(snapshot.heap_max_mb, 1024.0);
    }

    #[test]
    fn test_heap_sums_regions_and_ignores_nonheap() {
        let source = FakeSource {
            used: vec![
                MemoryRegion::new("heap", "eden", 100.0 * MB),
                MemoryRegion::new("heap", "old", 200.0 * MB),
                MemoryRegion::new("nonheap", "code", 999.0 * MB),
            ],
            max: vec![
                MemoryRegion::new("heap", "eden", 300.0 * MB),
                MemoryRegion::new("heap", "old", 300.0 * MB),
            ],
            ..Default::default()
        };

        let heap = HeapUsage::read(&source).unwrap();
        assert_eq!(heap.used_mb(), 300.0);
        assert_eq!(heap.max_mb(), 600.0);
        assert_eq!(heap.percent(), Some(50.0));
    }

    #[test]
    fn test_heap_percent_absent_when_max_zero() {
        let source = FakeSource {
            used: vec![MemoryRegion::new("heap", "eden", 512.0 * MB)],
            ..Default::default()
        };

        let snapshot = SystemSnapshot::capture(&source);
        assert_eq!(snapshot.heap_usage_percent, None);
        assert_eq!(snapshot.heap_max_mb, 0.0);
    }

    #[test]
    fn test_scalar_fields() {
        let snapshot = SystemSnapshot::capture(&FakeSource::default());
        assert_eq!(snapshot.cpu_usage_percent, Some(25.0));
        assert_eq!(snapshot.live_threads, Some(17));
        assert_eq!(snapshot.gc_pause_millis, Some(1500.0));
    }

    #[test]
    fn test_failures_degrade_per_field() {
        let source = FakeSource {
            fail_memory: true,
            fail_gauges: true,
            ..Default::default()
        };

        let snapshot = SystemSnapshot::capture(&source);
        assert_eq!(snapshot.cpu_usage_percent, None);
        assert_eq!(snapshot.live_threads, None);
        assert_eq!(snapshot.heap_used_mb, 0.0);
        assert_eq!(snapshot.heap_usage_percent, None);
        assert_eq!(snapshot.gc_pause_millis, Some(1500.0));
    }

    #[test]
    fn test_snapshot_json_shape() {
        let source = FakeSource {
            fail_gauges: true,
            ..Default::default()
        };
        let json = serde_json::to_value(SystemSnapshot::capture(&source)).unwrap();

        assert!(json["cpuUsagePercent"].is_null());
        assert!(json["heapUsagePercent"].is_null());
        assert_eq!(json["heapUsedMB"], 0.0);
        assert_eq!(json["heapMaxMB"], 0.0);
        assert!(json["liveThreads"].is_null());
        assert_eq!(json["gcPauseMillis"], 1500.0);
    }
}
