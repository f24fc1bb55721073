//! Metric Key Registry
//!
//! Discovers `(method, path)` keys in the raw sample source and exports each
//! one exactly once as three callback gauges (`api_request_count`,
//! `api_request_avg_seconds`, `api_request_max_seconds`) tagged `api=<key>`.
//! The callbacks read the live [`StatsTable`] at scrape time, so a key keeps
//! exposing its last known stats even after its raw timers disappear.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::domain::ports::{
    ExportSink, GaugeFn, GaugeSpec, SampleSource, TimerHandle, TAG_METHOD, TAG_URI,
};
use crate::error::Result;
use crate::metrics::stats::{ApiStatsEntry, StatsTable};

/// Exported request count gauge
pub const API_REQUEST_COUNT: &str = "api_request_count";
/// Exported average duration gauge
pub const API_REQUEST_AVG_SECONDS: &str = "api_request_avg_seconds";
/// Exported max duration gauge
pub const API_REQUEST_MAX_SECONDS: &str = "api_request_max_seconds";

const API_TAG: &str = "api";

/// Composite `"<METHOD> <PATH>"` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetricKey {
    pub method: String,
    pub path: String,
}

impl MetricKey {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }

    /// Derive the key from a timer's tags; `None` when either tag is missing.
    pub fn from_timer(timer: &dyn TimerHandle) -> Option<Self> {
        let method = timer.tag(TAG_METHOD)?;
        let path = timer.tag(TAG_URI)?;
        Some(Self::new(method, path))
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Field of [`ApiStatsEntry`] a gauge reads.
#[derive(Debug, Clone, Copy)]
enum StatField {
    Count,
    Avg,
    Max,
}

impl StatField {
    const ALL: [StatField; 3] = [StatField::Count, StatField::Avg, StatField::Max];

    fn metric_name(self) -> &'static str {
        match self {
            StatField::Count => API_REQUEST_COUNT,
            StatField::Avg => API_REQUEST_AVG_SECONDS,
            StatField::Max => API_REQUEST_MAX_SECONDS,
        }
    }

    fn help(self) -> &'static str {
        match self {
            StatField::Count => "Cumulative request count per API",
            StatField::Avg => "Average request duration per API in seconds",
            StatField::Max => "Maximum request duration per API in seconds",
        }
    }

    fn read(self, entry: &ApiStatsEntry) -> f64 {
        match self {
            StatField::Count => entry.count as f64,
            StatField::Avg => entry.avg,
            StatField::Max => entry.max,
        }
    }
}

/// Registers export gauges for each discovered key, once.
pub struct MetricKeyRegistry {
    source: Arc<dyn SampleSource>,
    sink: Arc<dyn ExportSink>,
    table: StatsTable,
    timer_name: String,
    registered: Mutex<HashSet<String>>,
}

impl MetricKeyRegistry {
    /// Create a registry reading timers named `timer_name`
    pub fn new(
        source: Arc<dyn SampleSource>,
        sink: Arc<dyn ExportSink>,
        table: StatsTable,
        timer_name: impl Into<String>,
    ) -> Self {
        Self {
            source,
            sink,
            table,
            timer_name: timer_name.into(),
            registered: Mutex::new(HashSet::new()),
        }
    }

    /// Distinct keys currently present in the raw source.
    ///
    /// Timers missing either tag are skipped. A failed source read yields an
    /// empty set.
    pub fn discover_keys(&self) -> BTreeSet<MetricKey> {
        match self.source.timers(&self.timer_name) {
            Ok(timers) => timers
                .iter()
                .filter_map(|t| MetricKey::from_timer(t.as_ref()))
                .collect(),
            Err(e) => {
                warn!("Key discovery failed for {}: {}", self.timer_name, e);
                BTreeSet::new()
            }
        }
    }

    /// Export gauges for `key` unless already done.
    ///
    /// Returns `true` when this call registered the key. A sink failure leaves
    /// the key unregistered so the next cycle retries it.
    pub fn ensure_registered(&self, key: &MetricKey) -> bool {
        let name = key.to_string();
        let mut registered = self.registered.lock();
        if registered.contains(&name) {
            return false;
        }

        self.table.ensure(&name);

        if let Err(e) = self.export(&name) {
            warn!("Failed to export gauges for {}: {}", name, e);
            return false;
        }

        registered.insert(name.clone());
        debug!("Registered API gauges for {}", name);
        true
    }

    /// Discover keys and register any new ones; returns the number added.
    pub fn register_all(&self) -> usize {
        let added = self
            .discover_keys()
            .iter()
            .filter(|key| self.ensure_registered(key))
            .count();
        if added > 0 {
            info!("Registered {} new API key(s)", added);
        }
        added
    }

    /// Whether `key` has been exported
    pub fn is_registered(&self, key: &str) -> bool {
        self.registered.lock().contains(key)
    }

    /// Number of exported keys
    pub fn len(&self) -> usize {
        self.registered.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.registered.lock().is_empty()
    }

    fn export(&self, key: &str) -> Result<()> {
        for field in StatField::ALL {
            let table = self.table.clone();
            let lookup = key.to_string();
            let value: GaugeFn = Box::new(move || {
                table
                    .get(&lookup)
                    .map(|entry| field.read(&entry))
                    .unwrap_or(0.0)
            });
            let spec = GaugeSpec::new(field.metric_name(), field.help(), API_TAG, key);
            self.sink.register_gauge(spec, value)?;
        }
        Ok(())
    }
}

impl fmt::Debug for MetricKeyRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricKeyRegistry")
            .field("timer_name", &self.timer_name)
            .field("registered", &self.len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
