//! Vitals
//!
//! Standalone actuator process: samples its own request timings and host
//! resources, and probes the configured external dependencies.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                            Vitals                                │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────┐       │
//! │  │  Scheduler   │───▶│ Stats / Trend│◀───│   Actuator   │       │
//! │  │ (30s / 60s)  │    │    tables    │    │    Server    │       │
//! │  └──────────────┘    └──────────────┘    └──────┬───────┘       │
//! │                                                 ▼               │
//! │                                   NMT │ Solr │ ASR │ DB probes  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vitals::adapters::{
    HttpProbe, LoggingNotifier, PoolProbe, PrometheusExportSink, SqlxConnectionPool,
    SysinfoResourceSource, WebSocketProbe,
};
use vitals::domain::ports::{ResourceSource, HTTP_SERVER_REQUESTS};
use vitals::error::{Error, Result};
use vitals::metrics::{AggregatorConfig, MetricKeyRegistry, RequestTimers, StatsAggregator, StatsTable};
use vitals::monitoring::{DependencyHealthMonitor, MonitorConfig, TrendBuffer, TrendConfig};
use vitals::scheduler::{Cadence, Scheduler};
use vitals::server::{self, Actuator};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Vitals - request load, system trends and dependency health
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Actuator server bind address
    #[arg(long, env = "VITALS_BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind_addr: String,

    /// Active profiles, prefixed to every api-load key
    #[arg(long, env = "VITALS_PROFILES", value_delimiter = ',')]
    profiles: Vec<String>,

    /// Environment name written into alerts
    #[arg(long, env = "VITALS_ENVIRONMENT", default_value = "production")]
    environment: String,

    /// Delay between stats aggregation cycles in seconds
    #[arg(long, env = "VITALS_STATS_INTERVAL_SECS", default_value = "30")]
    stats_interval_secs: u64,

    /// Trend sampling period in seconds
    #[arg(long, env = "VITALS_TREND_INTERVAL_SECS", default_value = "60")]
    trend_interval_secs: u64,

    /// Samples kept per trend signal
    #[arg(long, env = "VITALS_TREND_CAPACITY", default_value = "1440")]
    trend_capacity: usize,

    /// Machine-translation service URL (checked with POST)
    #[arg(long, env = "VITALS_NMT_URL")]
    nmt_url: Option<String>,

    /// Search service URL (checked with GET)
    #[arg(long, env = "VITALS_SOLR_URL")]
    solr_url: Option<String>,

    /// Speech-recognition WebSocket URL (checked with a handshake)
    #[arg(long, env = "VITALS_ASR_URL")]
    asr_url: Option<String>,

    /// Database URL (checked through the connection pool)
    #[arg(long, env = "VITALS_DATABASE_URL")]
    database_url: Option<String>,

    /// Timeout for HTTP checks and pool acquisition in seconds
    #[arg(long, env = "VITALS_CHECK_TIMEOUT_SECS", default_value = "5")]
    check_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    info!("Starting Vitals");
    info!("  Bind address: {}", args.bind_addr);
    info!("  Environment: {}", args.environment);
    info!("  Stats interval: {}s", args.stats_interval_secs);
    info!(
        "  Trend: every {}s, {} samples",
        args.trend_interval_secs, args.trend_capacity
    );

    // Raw source, export sink and the shared stats table
    let timers = Arc::new(RequestTimers::new());
    let sink = Arc::new(PrometheusExportSink::new());
    let stats = StatsTable::new();

    let registry = Arc::new(MetricKeyRegistry::new(
        timers.clone(),
        sink.clone(),
        stats.clone(),
        HTTP_SERVER_REQUESTS,
    ));
    info!("Registered {} api keys at startup", registry.register_all());

    let aggregator = Arc::new(StatsAggregator::new(
        AggregatorConfig {
            interval: Duration::from_secs(args.stats_interval_secs),
            ..Default::default()
        },
        timers.clone(),
        stats.clone(),
        registry,
    ));

    let resources: Arc<dyn ResourceSource> = Arc::new(SysinfoResourceSource::new());
    let trends = Arc::new(TrendBuffer::new(
        TrendConfig {
            interval: Duration::from_secs(args.trend_interval_secs),
            capacity: args.trend_capacity,
        },
        resources.clone(),
    ));

    let monitor = Arc::new(build_monitor(&args)?);
    monitor.export_availability(sink.as_ref())?;

    // Periodic tasks
    let scheduler = Scheduler::new();
    scheduler.schedule(
        aggregator,
        Cadence::FixedDelay(Duration::from_secs(args.stats_interval_secs)),
    );
    scheduler.schedule(
        trends.clone(),
        Cadence::FixedRate(Duration::from_secs(args.trend_interval_secs)),
    );

    // Actuator server
    let listener = server::bind(&args.bind_addr).await?;
    let actuator = Arc::new(Actuator::new(
        &args.profiles,
        stats,
        trends,
        resources,
        monitor,
        sink,
        timers,
    ));
    let server_handle = tokio::spawn(server::serve(listener, actuator, scheduler.token()));

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    scheduler.shutdown().await;
    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!("Actuator server error: {}", e),
        Err(e) => error!("Actuator server task failed: {}", e),
    }

    info!("Vitals shutdown complete");
    Ok(())
}

// =============================================================================
// Dependencies
// =============================================================================

fn build_monitor(args: &Args) -> Result<DependencyHealthMonitor> {
    let config = MonitorConfig {
        environment: args.environment.clone(),
        request_timeout: Duration::from_secs(args.check_timeout_secs),
        ..Default::default()
    };

    let handshake_timeout = config.handshake_timeout;
    let request_timeout = config.request_timeout;
    let mut monitor = DependencyHealthMonitor::new(config, Arc::new(LoggingNotifier::new()));

    if let Some(url) = &args.nmt_url {
        monitor = monitor.with_dependency("NMT", Arc::new(HttpProbe::post(url, request_timeout)?));
    }
    if let Some(url) = &args.solr_url {
        monitor = monitor.with_dependency("Solr", Arc::new(HttpProbe::get(url, request_timeout)?));
    }
    if let Some(url) = &args.asr_url {
        monitor = monitor.with_dependency(
            "ASR",
            Arc::new(WebSocketProbe::new(url, handshake_timeout)),
        );
    }
    if let Some(url) = &args.database_url {
        let pool = SqlxConnectionPool::connect_lazy(url, 2, request_timeout)?;
        monitor = monitor.with_dependency(
            "DB",
            Arc::new(PoolProbe::new(Arc::new(pool), request_timeout)),
        );
    }

    if monitor.dependency_names().is_empty() {
        info!("No external dependencies configured");
    }
    Ok(monitor)
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let mut filter = EnvFilter::from_default_env().add_directive(level.into());
    for directive in ["hyper=warn", "reqwest=warn", "sqlx=warn", "tungstenite=warn"] {
        filter = filter.add_directive(
            directive
                .parse::<Directive>()
                .map_err(|e| Error::Config(format!("Invalid log directive {}: {}", directive, e)))?,
        );
    }

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
    Ok(())
}
