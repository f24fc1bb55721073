//! Prometheus Export Adapter
//!
//! Implements the `ExportSink` port on a `prometheus::Registry`. Each gauge is
//! a custom collector that evaluates its callback on every scrape, so exported
//! values always reflect the live tables rather than a registration-time copy.

use std::sync::atomic::{AtomicUsize, Ordering};

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use tracing::debug;

use crate::domain::ports::{ExportSink, GaugeFn, GaugeSpec};
use crate::error::{Error, Result};

/// Gauge whose value is pulled from a callback at collection time.
struct CallbackGauge {
    gauge: Gauge,
    value: GaugeFn,
}

impl Collector for CallbackGauge {
    fn desc(&self) -> Vec<&Desc> {
        self.gauge.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.gauge.set((self.value)());
        self.gauge.collect()
    }
}

/// Prometheus-backed export sink.
pub struct PrometheusExportSink {
    registry: Registry,
    registered: AtomicUsize,
}

impl PrometheusExportSink {
    /// Create a sink with its own registry.
    pub fn new() -> Self {
        Self::with_registry(Registry::new())
    }

    /// Create a sink on an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self {
            registry,
            registered: AtomicUsize::new(0),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Number of gauges registered through this sink.
    pub fn registered_count(&self) -> usize {
        self.registered.load(Ordering::Relaxed)
    }

    /// Content type of [`gather_text`](Self::gather_text) output.
    pub fn content_type(&self) -> String {
        TextEncoder::new().format_type().to_string()
    }

    /// Scrape every gauge and encode in the Prometheus text format.
    pub fn gather_text(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| Error::Internal(format!("Metrics output is not UTF-8: {}", e)))
    }
}

impl Default for PrometheusExportSink {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PrometheusExportSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrometheusExportSink")
            .field("registered", &self.registered_count())
            .finish()
    }
}

impl ExportSink for PrometheusExportSink {
    fn register_gauge(&self, spec: GaugeSpec, value: GaugeFn) -> Result<bool> {
        let (tag_key, tag_value) = spec.tag;
        let opts = Opts::new(spec.name.clone(), spec.help).const_label(tag_key, tag_value);
        let gauge = Gauge::with_opts(opts)?;

        match self.registry.register(Box::new(CallbackGauge { gauge, value })) {
            Ok(()) => {
                self.registered.fetch_add(1, Ordering::Relaxed);
                Ok(true)
            }
            Err(prometheus::Error::AlreadyReg) => {
                debug!("Gauge {} already registered", spec.name);
                Ok(false)
            }
            Err(e) => Err(Error::Export(e)),
        }
    }
}
