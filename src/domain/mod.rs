//! Domain Layer
//!
//! Port traits for the collaborators the sampling core consults.
//!
//! # Usage
//!
//! ```ignore
//! use vitals::domain::ports::{SampleSource, HTTP_SERVER_REQUESTS};
//!
//! fn request_count<S: SampleSource>(source: &S) -> vitals::Result<u64> {
//!     let mut total = 0;
//!     for timer in source.timers(HTTP_SERVER_REQUESTS)? {
//!         total += timer.sample()?.count;
//!     }
//!     Ok(total)
//! }
//! ```

pub mod ports;

pub use ports::{
    AlertNotifier, ConnectionPool, DependencyProbe, ExportSink, GaugeFn, GaugeSpec,
    MemoryMeasure, MemoryRegion, PooledConnection, ResourceSource, SampleSource, TimerHandle,
    TimerSample,
};
