//! Actuator HTTP Server
//!
//! Read-only query surface over the shared tables:
//!
//! | route                                  | body                               |
//! |----------------------------------------|------------------------------------|
//! | `GET /actuator/api-load`               | per-endpoint `{count, avg, max}`   |
//! | `GET /actuator/system-health`          | current system snapshot            |
//! | `GET /actuator/system-health-trend-24h`| signal name to sample series       |
//! | `GET /actuator/health`                 | aggregate health, 200 or 503       |
//! | `GET /metrics`                         | Prometheus text exposition         |
//!
//! Every served request is timed into [`RequestTimers`], so the server's own
//! traffic shows up in the api-load statistics.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::adapters::PrometheusExportSink;
use crate::domain::ports::ResourceSource;
use crate::error::{Error, Result};
use crate::metrics::{ApiStatsEntry, RequestTimers, StatsTable};
use crate::monitoring::{DependencyHealthMonitor, SystemSnapshot, TrendBuffer};

pub const API_LOAD_PATH: &str = "/actuator/api-load";
pub const SYSTEM_HEALTH_PATH: &str = "/actuator/system-health";
pub const TREND_PATH: &str = "/actuator/system-health-trend-24h";
pub const HEALTH_PATH: &str = "/actuator/health";
pub const METRICS_PATH: &str = "/metrics";

/// Route tag recorded for requests that match no route
const UNMATCHED_ROUTE: &str = "NOT_FOUND";
const OTHER_METHOD: &str = "OTHER";

/// Timer tag for a request method. Extension methods share one tag.
fn method_tag(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::HEAD => "HEAD",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::CONNECT => "CONNECT",
        Method::OPTIONS => "OPTIONS",
        Method::TRACE => "TRACE",
        Method::PATCH => "PATCH",
        _ => OTHER_METHOD,
    }
}

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// Label prefixed to every api-load key; comma-joined profiles or `default`.
pub fn profile_label(profiles: &[String]) -> String {
    let active: Vec<&str> = profiles
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect();

    if active.is_empty() {
        "default".to_string()
    } else {
        active.join(",")
    }
}

// =============================================================================
// Actuator
// =============================================================================

/// Shared state behind the query routes
pub struct Actuator {
    profile: String,
    stats: StatsTable,
    trends: Arc<TrendBuffer>,
    resources: Arc<dyn ResourceSource>,
    monitor: Arc<DependencyHealthMonitor>,
    sink: Arc<PrometheusExportSink>,
    timers: Arc<RequestTimers>,
}

impl Actuator {
    pub fn new(
        profiles: &[String],
        stats: StatsTable,
        trends: Arc<TrendBuffer>,
        resources: Arc<dyn ResourceSource>,
        monitor: Arc<DependencyHealthMonitor>,
        sink: Arc<PrometheusExportSink>,
        timers: Arc<RequestTimers>,
    ) -> Self {
        Self {
            profile: profile_label(profiles),
            stats,
            trends,
            resources,
            monitor,
            sink,
            timers,
        }
    }

    /// Per-endpoint statistics keyed `"<profile> -> <METHOD> <PATH>"`
    pub fn api_load(&self) -> BTreeMap<String, ApiStatsEntry> {
        self.stats
            .snapshot()
            .into_iter()
            .map(|(key, entry)| (format!("{} -> {}", self.profile, key), entry))
            .collect()
    }

    pub fn system_health(&self) -> SystemSnapshot {
        SystemSnapshot::capture(self.resources.as_ref())
    }

    pub fn trends(&self) -> BTreeMap<String, Vec<f64>> {
        self.trends.snapshot()
    }

    /// Serve one request and record its timing.
    pub async fn handle<B>(&self, request: Request<B>) -> Response<Full<Bytes>> {
        let started = Instant::now();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        let (route, response) = self.route(&method, &path).await;

        debug!(
            "{} {} -> {} in {:?}",
            method,
            path,
            response.status(),
            started.elapsed()
        );
        self.timers.record_request(
            method_tag(&method),
            route,
            response.status().as_u16(),
            started.elapsed(),
        );
        response
    }

    async fn route(&self, method: &Method, path: &str) -> (&'static str, Response<Full<Bytes>>) {
        let route = match path {
            API_LOAD_PATH => API_LOAD_PATH,
            SYSTEM_HEALTH_PATH => SYSTEM_HEALTH_PATH,
            TREND_PATH => TREND_PATH,
            HEALTH_PATH => HEALTH_PATH,
            METRICS_PATH => METRICS_PATH,
            _ => return (UNMATCHED_ROUTE, text(StatusCode::NOT_FOUND, TEXT, "not found")),
        };

        if method != Method::GET {
            return (
                route,
                text(StatusCode::METHOD_NOT_ALLOWED, TEXT, "method not allowed"),
            );
        }

        let response = match route {
            API_LOAD_PATH => json(StatusCode::OK, &self.api_load()),
            SYSTEM_HEALTH_PATH => json(StatusCode::OK, &self.system_health()),
            TREND_PATH => json(StatusCode::OK, &self.trends()),
            HEALTH_PATH => {
                let report = self.monitor.overall_health().await;
                let status = if report.is_up() {
                    StatusCode::OK
                } else {
                    StatusCode::SERVICE_UNAVAILABLE
                };
                json(status, &report)
            }
            _ => match self.sink.gather_text() {
                Ok(body) => text(StatusCode::OK, &self.sink.content_type(), body),
                Err(e) => {
                    error!("Failed to encode metrics: {}", e);
                    text(StatusCode::INTERNAL_SERVER_ERROR, TEXT, "metrics unavailable")
                }
            },
        };
        (route, response)
    }
}

impl std::fmt::Debug for Actuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Actuator")
            .field("profile", &self.profile)
            .field("endpoints", &self.stats.len())
            .finish()
    }
}

fn text(status: StatusCode, content_type: &str, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    if let Ok(value) = HeaderValue::from_str(content_type) {
        response.headers_mut().insert(CONTENT_TYPE, value);
    }
    response
}

fn json<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(bytes) => text(status, JSON, bytes),
        Err(e) => {
            error!("Failed to serialize response: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, TEXT, "serialization failed")
        }
    }
}

// =============================================================================
// Server
// =============================================================================

/// Bind the actuator listener.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let addr: SocketAddr = addr
        .parse()
        .map_err(|e| Error::Config(format!("Invalid bind address {}: {}", addr, e)))?;
    Ok(TcpListener::bind(addr).await?)
}

/// Accept connections until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    actuator: Arc<Actuator>,
    shutdown: CancellationToken,
) -> Result<()> {
    info!("Actuator server listening on {}", listener.local_addr()?);

    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Actuator server stopping");
                return Ok(());
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Accept error: {}", e);
                    continue;
                }
            },
        };

        let io = TokioIo::new(stream);
        let actuator = actuator.clone();

        tokio::spawn(async move {
            let service = service_fn(move |request| {
                let actuator = actuator.clone();
                async move { Ok::<_, Infallible>(actuator.handle(request).await) }
            });

            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                debug!("Connection from {} closed with error: {}", peer, e);
            }
        });
    }
}
