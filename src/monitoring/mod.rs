//! Runtime Monitoring
//!
//! System resource snapshots, 24-hour trends and dependency health.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────────┐
//! │                           Monitoring                                      │
//! ├──────────────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐  │
//! │  │ SystemSnapshot │  │  TrendBuffer   │  │ DependencyHealthMonitor    │  │
//! │  │ (on request)   │  │ (fixed rate)   │  │ (on request, debounced)    │  │
//! │  └────────────────┘  └────────────────┘  └────────────────────────────┘  │
//! │          │                   │                        │                  │
//! │          └───────────────────┘                        │                  │
//! │                    │                                  │                  │
//! │          ┌─────────────────────┐            ┌──────────────────┐         │
//! │          │   ResourceSource    │            │ DependencyProbe  │         │
//! │          └─────────────────────┘            │ AlertNotifier    │         │
//! │                                             └──────────────────┘         │
//! └──────────────────────────────────────────────────────────────────────────┘
//! ```

mod health;
mod proptest;
mod system;
mod trend;

pub use health::{
    Alert, DependencyHealthMonitor, HealthReport, MonitorConfig, ServiceState, ServiceStatus,
    AVAILABLE, EXTERNAL_SERVICE_UP, UNAVAILABLE,
};
pub use system::{HeapUsage, SystemSnapshot};
pub use trend::{TrendBuffer, TrendConfig, TrendSeries, TrendSignal, TREND_CAPACITY};
