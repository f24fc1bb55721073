//! Dependency Health Monitor
//!
//! Probes external dependencies on demand and keeps one UP/DOWN status per
//! dependency. Each outage alerts exactly once: the first failed check of an
//! outage run fires the alert and sets `alert_sent`; later failures are quiet
//! until a successful check re-arms it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::ports::{AlertNotifier, DependencyProbe, ExportSink, GaugeSpec};
use crate::error::Result;

/// Exported availability gauge (1 = up, 0 = down or unknown)
pub const EXTERNAL_SERVICE_UP: &str = "external_service_up";

/// Detail string for an available dependency
pub const AVAILABLE: &str = "Available";

/// Detail string for an unavailable dependency
pub const UNAVAILABLE: &str = "Unavailable";

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the health monitor and its probes
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Environment tag written into alerts
    pub environment: String,
    /// Hard bound on a handshake-protocol check
    pub handshake_timeout: Duration,
    /// Bound on HTTP requests and pool acquisition
    pub request_timeout: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            environment: "production".to_string(),
            handshake_timeout: Duration::from_secs(3),
            request_timeout: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Status
// =============================================================================

/// Dependency state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ServiceState {
    Up,
    Down,
}

impl ServiceState {
    pub fn from_available(available: bool) -> Self {
        if available {
            ServiceState::Up
        } else {
            ServiceState::Down
        }
    }

    pub fn is_up(&self) -> bool {
        *self == ServiceState::Up
    }
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceState::Up => write!(f, "UP"),
            ServiceState::Down => write!(f, "DOWN"),
        }
    }
}

/// Status of one dependency.
///
/// `alert_sent` is only ever true while `state` is `Down`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub state: ServiceState,
    pub alert_sent: bool,
}

impl ServiceStatus {
    pub fn up() -> Self {
        Self {
            state: ServiceState::Up,
            alert_sent: false,
        }
    }

    pub fn down() -> Self {
        Self {
            state: ServiceState::Down,
            alert_sent: false,
        }
    }
}

/// Aggregate health response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// UP only when every dependency is available
    pub status: ServiceState,
    /// Per-dependency `Available` / `Unavailable`
    pub details: BTreeMap<String, String>,
}

impl HealthReport {
    pub fn new(results: impl IntoIterator<Item = (String, bool)>) -> Self {
        let mut all_up = true;
        let details = results
            .into_iter()
            .map(|(name, available)| {
                all_up &= available;
                let detail = if available { AVAILABLE } else { UNAVAILABLE };
                (name, detail.to_string())
            })
            .collect();

        Self {
            status: ServiceState::from_available(all_up),
            details,
        }
    }

    pub fn is_up(&self) -> bool {
        self.status.is_up()
    }
}

// =============================================================================
// Alert
// =============================================================================

/// Outage alert for one dependency
#[derive(Debug, Clone, PartialEq)]
pub struct Alert {
    pub service: String,
    pub raised_at: DateTime<Utc>,
    pub environment: String,
}

impl Alert {
    pub fn new(service: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            raised_at: Utc::now(),
            environment: environment.into(),
        }
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "⚠ ALERT: [{}] is DOWN!\nTime: {}\nEnvironment: {}\nAction Required: Please check immediately.",
            self.service,
            self.raised_at.format("%Y-%m-%d %H:%M:%S %Z"),
            self.environment
        )
    }
}

// =============================================================================
// Monitor
// =============================================================================

struct Dependency {
    name: String,
    probe: Arc<dyn DependencyProbe>,
}

/// Checks dependencies and debounces outage alerts
pub struct DependencyHealthMonitor {
    config: MonitorConfig,
    dependencies: Vec<Dependency>,
    statuses: Arc<DashMap<String, ServiceStatus>>,
    notifier: Arc<dyn AlertNotifier>,
}

impl DependencyHealthMonitor {
    pub fn new(config: MonitorConfig, notifier: Arc<dyn AlertNotifier>) -> Self {
        Self {
            config,
            dependencies: Vec::new(),
            statuses: Arc::new(DashMap::new()),
            notifier,
        }
    }

    /// Add a dependency to monitor
    pub fn with_dependency(
        mut self,
        name: impl Into<String>,
        probe: Arc<dyn DependencyProbe>,
    ) -> Self {
        let name = name.into();
        info!("Monitoring {} via {}", name, probe.protocol());
        self.dependencies.push(Dependency { name, probe });
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Names of monitored dependencies, in registration order
    pub fn dependency_names(&self) -> Vec<&str> {
        self.dependencies.iter().map(|d| d.name.as_str()).collect()
    }

    /// Last recorded status, `None` before the first check
    pub fn status(&self, name: &str) -> Option<ServiceStatus> {
        self.statuses.get(name).map(|s| *s)
    }

    /// Export an `external_service_up{service=<name>}` gauge per dependency
    pub fn export_availability(&self, sink: &dyn ExportSink) -> Result<()> {
        for dependency in &self.dependencies {
            let statuses = self.statuses.clone();
            let name = dependency.name.clone();
            sink.register_gauge(
                GaugeSpec::new(
                    EXTERNAL_SERVICE_UP,
                    "External service availability",
                    "service",
                    &dependency.name,
                ),
                Box::new(move || match statuses.get(&name) {
                    Some(s) if s.state.is_up() => 1.0,
                    _ => 0.0,
                }),
            )?;
        }
        Ok(())
    }

    /// Check one dependency by name; `None` if it is not monitored.
    pub async fn check(&self, name: &str) -> Option<bool> {
        let dependency = self.dependencies.iter().find(|d| d.name == name)?;
        Some(self.check_dependency(dependency).await)
    }

    /// Check every dependency concurrently and AND the results
    #[instrument(skip(self))]
    pub async fn overall_health(&self) -> HealthReport {
        let results = join_all(self.dependencies.iter().map(|d| async move {
            (d.name.clone(), self.check_dependency(d).await)
        }))
        .await;

        let report = HealthReport::new(results);
        debug!("Overall health: {}", report.status);
        report
    }

    async fn check_dependency(&self, dependency: &Dependency) -> bool {
        let started = Instant::now();
        let available = dependency.probe.probe().await;
        debug!(
            "{} ({}) {} in {:?}",
            dependency.name,
            dependency.probe.protocol(),
            if available { AVAILABLE } else { UNAVAILABLE },
            started.elapsed()
        );
        self.record_outcome(&dependency.name, available).await;
        available
    }

    /// Apply one check outcome to the status table.
    ///
    /// A success always re-arms the alert, whether or not an outage preceded it.
    pub async fn record_outcome(&self, name: &str, available: bool) {
        if available {
            if let Some(previous) = self.statuses.insert(name.to_string(), ServiceStatus::up()) {
                if !previous.state.is_up() {
                    info!("{} recovered", name);
                }
            }
        } else {
            self.send_alert_once(name).await;
        }
    }

    /// Mark `name` down and alert unless this outage already alerted.
    async fn send_alert_once(&self, name: &str) {
        let armed = {
            let mut status = self
                .statuses
                .entry(name.to_string())
                .or_insert_with(ServiceStatus::down);
            status.state = ServiceState::Down;
            !std::mem::replace(&mut status.alert_sent, true)
        };

        if !armed {
            debug!("{} still down, alert already sent", name);
            return;
        }

        warn!("{} is DOWN, sending alert", name);
        let alert = Alert::new(name, &self.config.environment);
        if let Err(e) = self.notifier.notify(alert.to_string()).await {
            error!("Failed to deliver alert for {}: {}", name, e);
        }
    }
}

impl fmt::Debug for DependencyHealthMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyHealthMonitor")
            .field("config", &self.config)
            .field("dependencies", &self.dependency_names())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryNotifier, PrometheusExportSink};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays a fixed sequence of outcomes, then stays up.
    struct ScriptedProbe {
        outcomes: Mutex<VecDeque<bool>>,
    }

    impl ScriptedProbe {
        fn new(outcomes: &[bool]) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.iter().copied().collect()),
            })
        }
    }

    #[async_trait]
    impl DependencyProbe for ScriptedProbe {
        fn protocol(&self) -> &'static str {
            "scripted"
        }

        async fn probe(&self) -> bool {
            self.outcomes.lock().pop_front().unwrap_or(true)
        }
    }

    fn monitor(notifier: Arc<InMemoryNotifier>) -> DependencyHealthMonitor {
        DependencyHealthMonitor::new(MonitorConfig::default(), notifier)
    }

    #[test]
    fn test_monitor_config_default() {
        let config = MonitorConfig::default();
        assert_eq!(config.handshake_timeout, Duration::from_secs(3));
        assert_eq!(config.environment, "production");
    }

    #[test]
    fn test_service_state_display() {
        assert_eq!(ServiceState::Up.to_string(), "UP");
        assert_eq!(ServiceState::Down.to_string(), "DOWN");
    }

    #[tokio::test]
    async fn test_one_alert_per_outage_run() {
        let notifier = Arc::new(InMemoryNotifier::new());
        let monitor = monitor(notifier.clone())
            .with_dependency("NMT", ScriptedProbe::new(&[false, false, false, true, false]));

        for _ in 0..5 {
            monitor.check("NMT").await;
        }

        assert_eq!(notifier.len(), 2);
        assert!(notifier.messages().iter().all(|m| m.contains("[NMT] is DOWN!")));
    }

    #[tokio::test]
    async fn test_success_rearms_alert() {
        let notifier = Arc::new(InMemoryNotifier::new());
        let monitor = monitor(notifier.clone());

        monitor.record_outcome("DB", false).await;
        assert_eq!(
            monitor.status("DB"),
            Some(ServiceStatus {
                state: ServiceState::Down,
                alert_sent: true
            })
        );

        monitor.record_outcome("DB", true).await;
        assert_eq!(monitor.status("DB"), Some(ServiceStatus::up()));

        // First-ever success also leaves the alert armed
        monitor.record_outcome("Solr", true).await;
        assert_eq!(monitor.status("Solr"), Some(ServiceStatus::up()));
        assert_eq!(notifier.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_dependency() {
        let monitor = monitor(Arc::new(InMemoryNotifier::new()));
        assert_eq!(monitor.check("missing").await, None);
        assert_eq!(monitor.status("missing"), None);
    }

    #[tokio::test]
    async fn test_overall_health_ands_checks() {
        let notifier = Arc::new(InMemoryNotifier::new());
        let monitor = monitor(notifier.clone())
            .with_dependency("NMT", ScriptedProbe::new(&[true]))
            .with_dependency("DB", ScriptedProbe::new(&[false]));

        let report = monitor.overall_health().await;
        assert!(!report.is_up());
        assert_eq!(report.details["NMT"], AVAILABLE);
        assert_eq!(report.details["DB"], UNAVAILABLE);
        assert_eq!(notifier.len(), 1);

        let report = monitor.overall_health().await;
        assert!(report.is_up());
    }

    #[tokio::test]
    async fn test_no_dependencies_is_up() {
        let report = monitor(Arc::new(InMemoryNotifier::new()))
            .overall_health()
            .await;
        assert!(report.is_up());
        assert!(report.details.is_empty());
    }

    #[tokio::test]
    async fn test_availability_gauge_follows_status() {
        let sink = PrometheusExportSink::new();
        let monitor = monitor(Arc::new(InMemoryNotifier::new()))
            .with_dependency("ASR", ScriptedProbe::new(&[false, true]));
        monitor.export_availability(&sink).unwrap();

        let text = sink.gather_text().unwrap();
        assert!(text.contains("external_service_up{service=\"ASR\"} 0"));

        monitor.check("ASR").await;
        monitor.check("ASR").await;
        let text = sink.gather_text().unwrap();
        assert!(text.contains("external_service_up{service=\"ASR\"} 1"));
    }

    #[test]
    fn test_alert_format() {
        let alert = Alert::new("ASR", "staging");
        let text = alert.to_string();

        assert!(text.starts_with("⚠ ALERT: [ASR] is DOWN!\nTime: "));
        assert!(text.contains(" UTC\nEnvironment: staging\n"));
        assert!(text.ends_with("Action Required: Please check immediately."));
    }

    #[test]
    fn test_health_report_serialization() {
        let report = HealthReport::new(vec![("DB".to_string(), true)]);
        let json = serde_json::to_string(&report).unwrap();
        assert_eq!(json, r#"{"status":"UP","details":{"DB":"Available"}}"#);
    }
}
