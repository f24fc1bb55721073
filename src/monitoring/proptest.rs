//! Property-Based Tests for Trend Series
//!
//! # Test Properties
//!
//! 1. **Bounded**: a series never holds more than its capacity
//! 2. **Suffix**: after any number of pushes it holds exactly the most recent
//!    `min(n, capacity)` values, oldest first

#![cfg(test)]

use proptest::prelude::*;

use super::trend::TrendSeries;

fn values_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1.0e6f64..1.0e6, 0..3000)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_series_never_exceeds_capacity(capacity in 1usize..2000, values in values_strategy()) {
        let mut series = TrendSeries::new(capacity);
        for v in &values {
            series.push(*v);
            prop_assert!(series.len() <= capacity);
        }
    }

    #[test]
    fn prop_series_keeps_most_recent_in_order(capacity in 1usize..2000, values in values_strategy()) {
        let mut series = TrendSeries::new(capacity);
        for v in &values {
            series.push(*v);
        }

        let start = values.len().saturating_sub(capacity);
        prop_assert_eq!(series.to_vec(), values[start..].to_vec());
    }
}

#[test]
fn test_default_capacity_after_overflow() {
    let mut series = TrendSeries::new(super::TREND_CAPACITY);
    for i in 0..(super::TREND_CAPACITY + 10) {
        series.push(i as f64);
    }

    let values = series.to_vec();
    assert_eq!(values.len(), 1440);
    assert_eq!(values.first(), Some(&10.0));
    assert_eq!(values.last(), Some(&1449.0));
}
