//! Stats Aggregator
//!
//! Periodically re-reads every request timer, groups them by
//! `"<METHOD> <PATH>"` and overwrites that key's [`ApiStatsEntry`]. Each cycle
//! is a full recompute from the source's cumulative values, so nothing
//! accumulates across cycles.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::domain::ports::{SampleSource, TimerHandle, HTTP_SERVER_REQUESTS};
use crate::metrics::registry::{MetricKey, MetricKeyRegistry};
use crate::metrics::stats::{ApiStatsEntry, StatsTable};
use crate::scheduler::PeriodicTask;

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the stats aggregator
#[derive(Debug, Clone)]
pub struct AggregatorConfig {
    /// Delay between the end of one cycle and the start of the next
    pub interval: Duration,

    /// Timer name to aggregate
    pub timer_name: String,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timer_name: HTTP_SERVER_REQUESTS.to_string(),
        }
    }
}

/// Outcome of one aggregation cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Keys whose entry was rewritten
    pub updated: usize,
    /// Keys skipped because a timer read failed
    pub skipped: usize,
    /// Keys newly exported this cycle
    pub registered: usize,
}

// =============================================================================
// Aggregator
// =============================================================================

/// Recomputes per-key request statistics
pub struct StatsAggregator {
    config: AggregatorConfig,
    source: Arc<dyn SampleSource>,
    table: StatsTable,
    registry: Arc<MetricKeyRegistry>,
}

impl StatsAggregator {
    pub fn new(
        config: AggregatorConfig,
        source: Arc<dyn SampleSource>,
        table: StatsTable,
        registry: Arc<MetricKeyRegistry>,
    ) -> Self {
        Self {
            config,
            source,
            table,
            registry,
        }
    }

    pub fn config(&self) -> &AggregatorConfig {
        &self.config
    }

    /// Run one full aggregation pass.
    #[instrument(skip(self), fields(timer = %self.config.timer_name))]
    pub fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let timers = match self.source.timers(&self.config.timer_name) {
            Ok(timers) => timers,
            Err(e) => {
                warn!("Raw sample source unavailable, skipping cycle: {}", e);
                return report;
            }
        };

        let mut groups: BTreeMap<MetricKey, Vec<Arc<dyn TimerHandle>>> = BTreeMap::new();
        for timer in timers {
            if let Some(key) = MetricKey::from_timer(timer.as_ref()) {
                groups.entry(key).or_default().push(timer);
            }
        }

        for (key, members) in groups {
            let samples: crate::Result<Vec<_>> = members.iter().map(|t| t.sample()).collect();
            match samples {
                Ok(samples) => {
                    self.table
                        .insert(key.to_string(), ApiStatsEntry::from_samples(&samples));
                    report.updated += 1;
                }
                Err(e) => {
                    warn!("Skipping {} this cycle: {}", key, e);
                    report.skipped += 1;
                }
            }
        }

        report.registered = self.registry.register_all();

        debug!(
            "Aggregation cycle complete: {} updated, {} skipped, {} registered",
            report.updated, report.skipped, report.registered
        );
        report
    }
}

#[async_trait]
impl PeriodicTask for StatsAggregator {
    fn name(&self) -> &str {
        "stats-aggregator"
    }

    async fn run(&self) {
        self.run_cycle();
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::PrometheusExportSink;
    use crate::domain::ports::TimerSample;
    use crate::error::{Error, Result};
    use crate::metrics::timers::RequestTimers;

    struct FailingTimer {
        method: &'static str,
        uri: &'static str,
    }

    impl TimerHandle for FailingTimer {
        fn tag(&self, key: &str) -> Option<String> {
            match key {
                "method" => Some(self.method.to_string()),
                "uri" => Some(self.uri.to_string()),
                _ => None,
            }
        }

        fn sample(&self) -> Result<TimerSample> {
            Err(Error::source_read("timer", "meter removed"))
        }
    }

    struct MixedSource {
        healthy: Arc<RequestTimers>,
    }

    impl SampleSource for MixedSource {
        fn timers(&self, name: &str) -> Result<Vec<Arc<dyn TimerHandle>>> {
            let mut timers = self.healthy.timers(name)?;
            timers.push(Arc::new(FailingTimer {
                method: "GET",
                uri: "/broken",
            }));
            Ok(timers)
        }
    }

    struct DownSource;

    impl SampleSource for DownSource {
        fn timers(&self, _name: &str) -> Result<Vec<Arc<dyn TimerHandle>>> {
            Err(Error::source_read("registry", "unreachable"))
        }
    }

    fn build(source: Arc<dyn SampleSource>) -> (StatsAggregator, StatsTable, Arc<MetricKeyRegistry>) {
        let table = StatsTable::new();
        let registry = Arc::new(MetricKeyRegistry::new(
            source.clone(),
            Arc::new(PrometheusExportSink::new()),
            table.clone(),
            HTTP_SERVER_REQUESTS,
        ));
        let aggregator = StatsAggregator::new(
            AggregatorConfig::default(),
            source,
            table.clone(),
            registry.clone(),
        );
        (aggregator, table, registry)
    }

    #[test]
    fn test_aggregator_config_default() {
        let config = AggregatorConfig::default();
        assert_eq!(config.interval, Duration::from_secs(30));
        assert_eq!(config.timer_name, HTTP_SERVER_REQUESTS);
    }

    #[test]
    fn test_cycle_merges_timers_sharing_key() {
        let timers = Arc::new(RequestTimers::new());
        timers.record_request("GET", "/users", 200, Duration::from_millis(100));
        timers.record_request("GET", "/users", 200, Duration::from_millis(300));
        timers.record_request("GET", "/users", 500, Duration::from_millis(800));

        let (aggregator, table, registry) = build(timers);
        let report = aggregator.run_cycle();

        assert_eq!(report.updated, 1);
        assert_eq!(report.registered, 1);
        let entry = table.get("GET /users").unwrap();
        assert_eq!(entry.count, 3);
        assert!((entry.avg - 0.4).abs() < 1e-9);
        assert!((entry.max - 0.8).abs() < 1e-9);
        assert!(registry.is_registered("GET /users"));
    }

    #[test]
    fn test_cycle_overwrites_rather_than_accumulates() {
        let timers = Arc::new(RequestTimers::new());
        timers.record_request("GET", "/a", 200, Duration::from_millis(10));

        let (aggregator, table, _) = build(timers.clone());
        aggregator.run_cycle();
        aggregator.run_cycle();
        assert_eq!(table.get("GET /a").unwrap().count, 1);

        timers.record_request("GET", "/a", 200, Duration::from_millis(10));
        aggregator.run_cycle();
        assert_eq!(table.get("GET /a").unwrap().count, 2);
    }

    #[test]
    fn test_failing_key_does_not_abort_cycle() {
        let timers = Arc::new(RequestTimers::new());
        timers.record_request("GET", "/ok", 200, Duration::from_millis(10));

        let (aggregator, table, _) = build(Arc::new(MixedSource { healthy: timers }));
        let report = aggregator.run_cycle();

        assert_eq!(report.updated, 1);
        assert_eq!(report.skipped, 1);
        assert!(table.contains("GET /ok"));
    }

    #[test]
    fn test_source_down_leaves_table_untouched() {
        let (aggregator, table, registry) = build(Arc::new(DownSource));
        let report = aggregator.run_cycle();

        assert_eq!(report, CycleReport::default());
        assert!(table.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unseen_keys_have_no_entry() {
        let timers = Arc::new(RequestTimers::new());
        timers.record_request("GET", "/seen", 200, Duration::from_millis(1));

        let (aggregator, table, _) = build(timers);
        aggregator.run_cycle();

        assert!(table.contains("GET /seen"));
        assert!(!table.contains("GET /unseen"));
        assert_eq!(table.len(), 1);
    }
}
