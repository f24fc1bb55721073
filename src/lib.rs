//! Vitals - In-Process Observability
//!
//! Samples a service's own request timings and resource usage, keeps
//! per-endpoint load statistics and 24-hour system trends, and probes
//! external dependencies with one alert per outage.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           Vitals                                 │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐    ┌──────────────┐    ┌──────────────────┐   │
//! │  │    Stats     │    │    Trend     │    │   Dependency     │   │
//! │  │  Aggregator  │    │    Buffer    │    │  Health Monitor  │   │
//! │  │ (fixed delay)│    │ (fixed rate) │    │   (on request)   │   │
//! │  └──────────────┘    └──────────────┘    └──────────────────┘   │
//! │          │                   │                    │             │
//! │          └─────────── Actuator Server ────────────┘             │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`adapters`] - Infrastructure adapters implementing domain ports
//! - [`domain`] - Port traits for every external collaborator
//! - [`error`] - Error types
//! - [`metrics`] - Request timers, per-endpoint stats and gauge registration
//! - [`monitoring`] - System snapshot, trends and dependency health
//! - [`scheduler`] - Fixed-delay and fixed-rate periodic tasks
//! - [`server`] - HTTP query surface and Prometheus exposition

pub mod adapters;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod monitoring;
pub mod scheduler;
pub mod server;

// Re-export commonly used types
pub use error::{Error, Result};
pub use metrics::{MetricKeyRegistry, RequestTimers, StatsAggregator, StatsTable};
pub use monitoring::{DependencyHealthMonitor, SystemSnapshot, TrendBuffer};
pub use scheduler::{Cadence, Scheduler};
pub use server::Actuator;
