//! Request Timers
//!
//! Lock-free timer meters keyed by name and tags. This is the in-process
//! raw sample source: the HTTP server records one duration per request and
//! the aggregator reads the cumulative values back through [`SampleSource`].

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use crate::domain::ports::{SampleSource, TimerHandle, TimerSample, TAG_METHOD, TAG_URI};
use crate::error::Result;

/// Tag carrying the response status on request timers.
pub const TAG_STATUS: &str = "status";

/// Timer identity: name plus sorted tags.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TimerId {
    /// Meter name
    pub name: String,
    /// Tags, sorted by key
    pub tags: BTreeMap<String, String>,
}

impl TimerId {
    /// Create a timer id from tag pairs
    pub fn new(name: impl Into<String>, tags: &[(&str, &str)]) -> Self {
        Self {
            name: name.into(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

/// Timer meter
pub struct RequestTimer {
    id: TimerId,
    count: AtomicU64,
    total_nanos: AtomicU64,
    max_nanos: AtomicU64,
}

impl RequestTimer {
    /// Create a new timer
    pub fn new(id: TimerId) -> Self {
        Self {
            id,
            count: AtomicU64::new(0),
            total_nanos: AtomicU64::new(0),
            max_nanos: AtomicU64::new(0),
        }
    }

    /// Identity of this timer
    pub fn id(&self) -> &TimerId {
        &self.id
    }

    /// Record one duration
    pub fn record(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.count.fetch_add(1, Ordering::Relaxed);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.max_nanos.fetch_max(nanos, Ordering::Relaxed);
    }

    /// Number of recorded events
    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Sum of recorded durations
    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.total_nanos.load(Ordering::Relaxed))
    }

    /// Largest recorded duration
    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.max_nanos.load(Ordering::Relaxed))
    }
}

impl TimerHandle for RequestTimer {
    fn tag(&self, key: &str) -> Option<String> {
        self.id.tags.get(key).cloned()
    }

    fn sample(&self) -> Result<TimerSample> {
        Ok(TimerSample {
            count: self.count(),
            total_time: self.total_time(),
            max: self.max(),
        })
    }
}

/// Registry of request timers
#[derive(Default)]
pub struct RequestTimers {
    timers: RwLock<HashMap<TimerId, Arc<RequestTimer>>>,
}

impl RequestTimers {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a timer
    pub fn timer(&self, id: TimerId) -> Arc<RequestTimer> {
        let timers = self.timers.read();
        if let Some(timer) = timers.get(&id) {
            return timer.clone();
        }
        drop(timers);

        let mut timers = self.timers.write();
        timers
            .entry(id.clone())
            .or_insert_with(|| Arc::new(RequestTimer::new(id)))
            .clone()
    }

    /// Record one served request under [`HTTP_SERVER_REQUESTS`]
    ///
    /// [`HTTP_SERVER_REQUESTS`]: crate::domain::ports::HTTP_SERVER_REQUESTS
    pub fn record_request(&self, method: &str, uri: &str, status: u16, elapsed: Duration) {
        let status = status.to_string();
        let id = TimerId::new(
            crate::domain::ports::HTTP_SERVER_REQUESTS,
            &[(TAG_METHOD, method), (TAG_URI, uri), (TAG_STATUS, &status)],
        );
        self.timer(id).record(elapsed);
    }

    /// Number of registered timers
    pub fn len(&self) -> usize {
        self.timers.read().len()
    }

    /// Whether no timer is registered
    pub fn is_empty(&self) -> bool {
        self.timers.read().is_empty()
    }
}

impl SampleSource for RequestTimers {
    fn timers(&self, name: &str) -> Result<Vec<Arc<dyn TimerHandle>>> {
        Ok(self
            .timers
            .read()
            .values()
            .filter(|t| t.id.name == name)
            .map(|t| t.clone() as Arc<dyn TimerHandle>)
            .collect())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::HTTP_SERVER_REQUESTS;

    #[test]
    fn test_timer_record() {
        let timer = RequestTimer::new(TimerId::new("t", &[]));
        timer.record(Duration::from_millis(10));
        timer.record(Duration::from_millis(30));

        assert_eq!(timer.count(), 2);
        assert_eq!(timer.total_time(), Duration::from_millis(40));
        assert_eq!(timer.max(), Duration::from_millis(30));
    }

    #[test]
    fn test_same_timer_returned() {
        let timers = RequestTimers::new();
        let id = TimerId::new(HTTP_SERVER_REQUESTS, &[("method", "GET"), ("uri", "/a")]);

        let t1 = timers.timer(id.clone());
        let t2 = timers.timer(id);
        t1.record(Duration::from_millis(1));

        assert_eq!(t2.count(), 1);
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn test_status_splits_timers() {
        let timers = RequestTimers::new();
        timers.record_request("GET", "/a", 200, Duration::from_millis(5));
        timers.record_request("GET", "/a", 500, Duration::from_millis(7));
        timers.record_request("GET", "/a", 200, Duration::from_millis(9));

        let found = timers.timers(HTTP_SERVER_REQUESTS).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found
            .iter()
            .all(|t| t.tag("uri").as_deref() == Some("/a")));
    }

    #[test]
    fn test_timers_filtered_by_name() {
        let timers = RequestTimers::new();
        timers.timer(TimerId::new("other", &[])).record(Duration::from_millis(1));
        timers.record_request("POST", "/b", 201, Duration::from_millis(1));

        assert_eq!(timers.timers(HTTP_SERVER_REQUESTS).unwrap().len(), 1);
        assert_eq!(timers.timers("other").unwrap().len(), 1);
        assert!(timers.timers("missing").unwrap().is_empty());
    }
}
