//! Sysinfo Resource Adapter
//!
//! Implements the `ResourceSource` port with the `sysinfo` crate.
//!
//! | meter          | reading                                   |
//! |----------------|-------------------------------------------|
//! | `cpu.usage`    | global CPU utilisation, 0.0 - 1.0          |
//! | `threads.live` | thread count of this process              |
//! | `gc.pause`     | not tracked (no collector in this runtime)|
//! | heap used      | resident set size of this process         |
//! | heap max       | total physical memory                     |

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use sysinfo::{Pid, Process, ProcessRefreshKind, System, MINIMUM_CPU_UPDATE_INTERVAL};

use crate::domain::ports::{
    MemoryMeasure, MemoryRegion, ResourceSource, AREA_HEAP, CPU_USAGE, THREADS_LIVE,
};
use crate::error::{Error, Result};

struct SystemState {
    system: System,
    cpu_refreshed_at: Instant,
}

/// Resource source backed by OS statistics
pub struct SysinfoResourceSource {
    state: Mutex<SystemState>,
    pid: Option<Pid>,
}

impl SysinfoResourceSource {
    pub fn new() -> Self {
        let mut system = System::new();
        // Prime CPU counters so the first reading has a baseline
        system.refresh_cpu();
        system.refresh_memory();

        Self {
            state: Mutex::new(SystemState {
                system,
                cpu_refreshed_at: Instant::now(),
            }),
            pid: sysinfo::get_current_pid().ok(),
        }
    }

    /// Utilisation since the last CPU refresh. Within the platform minimum
    /// interval the previous reading is returned unchanged.
    fn cpu_ratio(&self) -> f64 {
        let mut state = self.state.lock();
        if state.cpu_refreshed_at.elapsed() >= MINIMUM_CPU_UPDATE_INTERVAL {
            state.system.refresh_cpu();
            state.cpu_refreshed_at = Instant::now();
        }
        state.system.global_cpu_info().cpu_usage() as f64 / 100.0
    }

    fn with_process<T>(&self, read: impl FnOnce(&Process) -> T) -> Result<T> {
        let pid = self
            .pid
            .ok_or_else(|| Error::source_read("process", "current pid unavailable"))?;

        let mut state = self.state.lock();
        state
            .system
            .refresh_pids_specifics(&[pid], ProcessRefreshKind::new().with_memory());
        let process = state
            .system
            .process(pid)
            .ok_or_else(|| Error::source_read("process", format!("pid {} not found", pid)))?;
        Ok(read(process))
    }

    fn live_threads(&self) -> Result<Option<f64>> {
        // The task set leaves out the main thread
        self.with_process(|process| process.tasks().map(|tasks| (tasks.len() + 1) as f64))
    }
}

impl Default for SysinfoResourceSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceSource for SysinfoResourceSource {
    fn gauge(&self, name: &str) -> Result<Option<f64>> {
        match name {
            CPU_USAGE => Ok(Some(self.cpu_ratio())),
            THREADS_LIVE => self.live_threads(),
            _ => Ok(None),
        }
    }

    fn timer_total(&self, _name: &str) -> Result<Option<Duration>> {
        Ok(None)
    }

    fn memory_regions(&self, measure: MemoryMeasure) -> Result<Vec<MemoryRegion>> {
        match measure {
            MemoryMeasure::Used => {
                let (resident, virtual_bytes) =
                    self.with_process(|process| (process.memory(), process.virtual_memory()))?;
                Ok(vec![
                    MemoryRegion::new(AREA_HEAP, "process-resident", resident as f64),
                    MemoryRegion::new("nonheap", "process-virtual", virtual_bytes as f64),
                ])
            }
            MemoryMeasure::Max => {
                let mut state = self.state.lock();
                state.system.refresh_memory();
                Ok(vec![MemoryRegion::new(
                    AREA_HEAP,
                    "system-total",
                    state.system.total_memory() as f64,
                )])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::GC_PAUSE;
    use crate::monitoring::SystemSnapshot;

    #[test]
    fn test_cpu_ratio_in_range() {
        let source = SysinfoResourceSource::new();
        let cpu = source.gauge(CPU_USAGE).unwrap().unwrap();
        assert!((0.0..=1.0).contains(&cpu));
    }

    #[test]
    fn test_gc_pause_not_tracked() {
        let source = SysinfoResourceSource::new();
        assert_eq!(source.timer_total(GC_PAUSE).unwrap(), None);
        assert_eq!(source.gauge("unknown.meter").unwrap(), None);
    }

    #[test]
    fn test_heap_regions_present() {
        let source = SysinfoResourceSource::new();
        let used = source.memory_regions(MemoryMeasure::Used).unwrap();
        let max = source.memory_regions(MemoryMeasure::Max).unwrap();

        assert!(used.iter().any(|r| r.area == AREA_HEAP && r.bytes > 0.0));
        assert!(max.iter().any(|r| r.area == AREA_HEAP && r.bytes > 0.0));
    }

    #[test]
    fn test_cpu_reading_stable_within_refresh_interval() {
        let source = SysinfoResourceSource::new();
        let first = source.gauge(CPU_USAGE).unwrap().unwrap();
        let second = source.gauge(CPU_USAGE).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_live_threads_on_linux() {
        let source = SysinfoResourceSource::new();
        let threads = source.gauge(THREADS_LIVE).unwrap().unwrap();
        assert!(threads >= 1.0);
    }

    #[test]
    fn test_snapshot_from_real_source() {
        let snapshot = SystemSnapshot::capture(&SysinfoResourceSource::new());
        let percent = snapshot.heap_usage_percent.unwrap();
        assert!(percent > 0.0 && percent <= 100.0);
        assert_eq!(snapshot.gc_pause_millis, None);
    }
}
