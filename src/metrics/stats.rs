//! Per-endpoint statistics table

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::domain::ports::TimerSample;

/// Aggregated statistics for one `"<METHOD> <PATH>"` key.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ApiStatsEntry {
    /// Cumulative request count across all timers sharing the key
    pub count: u64,
    /// Average duration in seconds, 0.0 when `count` is zero
    pub avg: f64,
    /// Largest single duration in seconds
    pub max: f64,
}

impl ApiStatsEntry {
    /// Merge timer samples: sum counts and totals, max-of-maxes.
    pub fn from_samples<'a, I>(samples: I) -> Self
    where
        I: IntoIterator<Item = &'a TimerSample>,
    {
        let mut count = 0u64;
        let mut total = 0.0f64;
        let mut max = 0.0f64;

        for sample in samples {
            count = count.saturating_add(sample.count);
            total += sample.total_time.as_secs_f64();
            max = max.max(sample.max.as_secs_f64());
        }

        let avg = if count > 0 { total / count as f64 } else { 0.0 };

        Self { count, avg, max }
    }
}

/// Shared key → stats table.
///
/// Cloning is cheap and every clone sees the same entries. Reads and writes
/// are atomic per key; there is no cross-key snapshot consistency.
#[derive(Debug, Clone, Default)]
pub struct StatsTable {
    entries: Arc<DashMap<String, ApiStatsEntry>>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current entry for a key
    pub fn get(&self, key: &str) -> Option<ApiStatsEntry> {
        self.entries.get(key).map(|e| *e)
    }

    /// Overwrite the entry for a key
    pub fn insert(&self, key: impl Into<String>, entry: ApiStatsEntry) {
        self.entries.insert(key.into(), entry);
    }

    /// Create a zeroed entry if the key is absent
    pub fn ensure(&self, key: &str) {
        if !self.entries.contains_key(key) {
            self.entries.entry(key.to_string()).or_default();
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Ordered copy of every entry
    pub fn snapshot(&self) -> BTreeMap<String, ApiStatsEntry> {
        self.entries
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }
}
