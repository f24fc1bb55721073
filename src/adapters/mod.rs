//! Infrastructure Adapters
//!
//! Concrete implementations of the domain ports, following the Port/Adapter
//! (Hexagonal) architecture pattern.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │  ResourceSource │ ExportSink │ AlertNotifier              │ │
//! │  │  DependencyProbe │ ConnectionPool                         │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ SysinfoResourceSource │ PrometheusExportSink              │ │
//! │  │ LoggingNotifier │ HttpProbe │ WebSocketProbe │ PoolProbe  │ │
//! │  │ SqlxConnectionPool                                        │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use vitals::adapters::{PrometheusExportSink, SysinfoResourceSource};
//! use vitals::monitoring::SystemSnapshot;
//!
//! let source = SysinfoResourceSource::new();
//! let snapshot = SystemSnapshot::capture(&source);
//! ```

mod database;
mod notifier;
mod probes;
mod prometheus;
mod sysinfo;

pub use self::database::SqlxConnectionPool;
pub use self::notifier::{InMemoryNotifier, LoggingNotifier};
pub use self::probes::{HttpProbe, PoolProbe, WebSocketProbe};
pub use self::prometheus::PrometheusExportSink;
pub use self::sysinfo::SysinfoResourceSource;
