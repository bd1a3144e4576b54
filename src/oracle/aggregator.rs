//! Robust Aggregator - Median consensus across sources
//!
//! The median bounds the influence of any single manipulated source to
//! which side of the sorted list it lands on, instead of averaging it in.

use std::collections::BTreeMap;

use crate::types::{Quote, QuoteOutcome, SourceId};

/// Consensus and per-source divergence for one cycle
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    /// `None` when no quote succeeded
    pub median: Option<f64>,
    /// Relative deviation `|value - median| / median` per source.
    /// Empty when the median is missing or not positive.
    pub per_source_deviation: BTreeMap<SourceId, f64>,
    pub max_deviation: Option<f64>,
    /// `(max - min) / min` across successful quotes
    pub spread: f64,
    pub successful_count: usize,
    pub total_count: usize,
}

impl AggregateResult {
    /// Deviations can only be computed against a finite, positive median
    pub fn deviation_defined(&self) -> bool {
        self.max_deviation.is_some()
    }

    /// Sources strictly above `threshold`, in source-id order
    pub fn sources_above(&self, threshold: f64) -> Vec<SourceId> {
        self.per_source_deviation
            .iter()
            .filter(|(_, &dev)| dev > threshold)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RobustAggregator;

impl RobustAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Aggregate a cycle's outcomes; failures only count toward `total_count`
    pub fn aggregate_outcomes(&self, outcomes: &[QuoteOutcome]) -> AggregateResult {
        let quotes: Vec<&Quote> = outcomes.iter().filter_map(QuoteOutcome::quote).collect();
        self.build(&quotes, outcomes.len())
    }

    /// Aggregate successful quotes. Input order does not affect the result.
    ///
    /// Source ids are expected to be unique, which `Sentinel` enforces at
    /// construction. A repeated id keeps its largest deviation, so
    /// `per_source_deviation` then holds fewer entries than
    /// `successful_count`.
    pub fn aggregate(&self, quotes: &[Quote]) -> AggregateResult {
        let refs: Vec<&Quote> = quotes.iter().collect();
        self.build(&refs, quotes.len())
    }

    fn build(&self, quotes: &[&Quote], total_count: usize) -> AggregateResult {
        let values: Vec<f64> = quotes.iter().map(|q| q.value).collect();
        let median = calculate_median(&values);

        let mut per_source_deviation = BTreeMap::new();
        if let Some(m) = median.filter(|m| m.is_finite() && *m > 0.0) {
            for quote in quotes {
                let dev = (quote.value - m).abs() / m;
                per_source_deviation
                    .entry(quote.source_id.clone())
                    .and_modify(|d: &mut f64| *d = d.max(dev))
                    .or_insert(dev);
            }
        }

        let max_deviation = per_source_deviation
            .values()
            .cloned()
            .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.max(d))));

        AggregateResult {
            median,
            per_source_deviation,
            max_deviation,
            spread: calculate_spread(&values),
            successful_count: quotes.len(),
            total_count,
        }
    }
}

/// Middle element for odd counts, mean of the two middle elements for even
pub fn calculate_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        // Halve first so two prices near f64::MAX do not overflow
        Some(sorted[mid - 1] / 2.0 + sorted[mid] / 2.0)
    }
}

/// Spread between highest and lowest price, relative to the lowest
fn calculate_spread(prices: &[f64]) -> f64 {
    if prices.is_empty() {
        return 0.0;
    }
    let min = prices.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if min <= 0.0 {
        return 0.0;
    }
    (max - min) / min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Failure, FailureReason};
    use chrono::Utc;

    fn make_quote(id: &str, value: f64) -> Quote {
        Quote {
            source_id: SourceId::from(id),
            value,
            timestamp: Utc::now(),
            latency_ms: 5,
        }
    }

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(calculate_median(&[150.0, 100.0, 102.0]), Some(102.0));
        assert_eq!(calculate_median(&[101.0, 100.0]), Some(100.5));
        assert_eq!(calculate_median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(calculate_median(&[7.0]), Some(7.0));
        assert_eq!(calculate_median(&[]), None);
    }

    #[test]
    fn test_even_median_near_f64_max_stays_finite() {
        let big = 1.6e308;
        assert_eq!(calculate_median(&[big, big]), Some(big));
        assert_eq!(calculate_median(&[f64::MAX, f64::MAX]), Some(f64::MAX));

        let result = RobustAggregator::new().aggregate(&[make_quote("a", big), make_quote("b", big)]);
        assert_eq!(result.median, Some(big));
        assert_eq!(result.max_deviation, Some(0.0));
        assert!(result.deviation_defined());
    }

    #[test]
    fn test_repeated_source_id_keeps_largest_deviation() {
        let quotes = vec![
            make_quote("a", 100.0),
            make_quote("a", 300.0),
            make_quote("b", 200.0),
        ];
        let result = RobustAggregator::new().aggregate(&quotes);

        assert_eq!(result.median, Some(200.0));
        assert_eq!(result.successful_count, 3);
        assert_eq!(result.per_source_deviation.len(), 2);
        assert_eq!(result.per_source_deviation[&SourceId::from("a")], 0.5);
        assert_eq!(result.per_source_deviation[&SourceId::from("b")], 0.0);
    }

    #[test]
    fn test_aggregate_manipulated_source() {
        let quotes = vec![
            make_quote("a", 100.0),
            make_quote("b", 102.0),
            make_quote("c", 150.0),
        ];
        let result = RobustAggregator::new().aggregate(&quotes);

        assert_eq!(result.median, Some(102.0));
        assert!((result.per_source_deviation[&SourceId::from("a")] - 2.0 / 102.0).abs() < 1e-12);
        assert_eq!(result.per_source_deviation[&SourceId::from("b")], 0.0);
        assert!((result.max_deviation.unwrap() - 48.0 / 102.0).abs() < 1e-12);
        assert_eq!(result.sources_above(0.05), vec![SourceId::from("c")]);
        assert!((result.spread - 0.5).abs() < 1e-12);
        assert_eq!(result.successful_count, 3);
        assert_eq!(result.total_count, 3);
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let quotes = vec![
            make_quote("a", 99.0),
            make_quote("b", 103.0),
            make_quote("c", 100.0),
            make_quote("d", 250.0),
        ];
        let mut reversed = quotes.clone();
        reversed.reverse();
        let mut rotated = quotes.clone();
        rotated.rotate_left(2);

        let aggregator = RobustAggregator::new();
        let base = aggregator.aggregate(&quotes);
        assert_eq!(base, aggregator.aggregate(&reversed));
        assert_eq!(base, aggregator.aggregate(&rotated));
    }

    #[test]
    fn test_identical_values_have_zero_deviation() {
        let quotes = vec![make_quote("a", 50.0), make_quote("b", 50.0), make_quote("c", 50.0)];
        let result = RobustAggregator::new().aggregate(&quotes);
        assert_eq!(result.max_deviation, Some(0.0));
        assert!(result.sources_above(0.0).is_empty());
    }

    #[test]
    fn test_outcomes_count_failures_in_total_only() {
        let outcomes = vec![
            QuoteOutcome::Quote(make_quote("a", 100.0)),
            QuoteOutcome::Failure(Failure {
                source_id: SourceId::from("b"),
                reason: FailureReason::Timeout,
                message: String::new(),
            }),
            QuoteOutcome::Quote(make_quote("c", 101.0)),
        ];
        let result = RobustAggregator::new().aggregate_outcomes(&outcomes);
        assert_eq!(result.successful_count, 2);
        assert_eq!(result.total_count, 3);
        assert_eq!(result.median, Some(100.5));
        assert!(!result.per_source_deviation.contains_key(&SourceId::from("b")));
    }

    #[test]
    fn test_degenerate_median_leaves_deviation_undefined() {
        let empty = RobustAggregator::new().aggregate(&[]);
        assert_eq!(empty.median, None);
        assert!(!empty.deviation_defined());

        // Only reachable when quotes bypass collector validation
        let zero = RobustAggregator::new().aggregate(&[make_quote("a", 0.0), make_quote("b", 0.0)]);
        assert_eq!(zero.median, Some(0.0));
        assert!(zero.per_source_deviation.is_empty());
        assert!(!zero.deviation_defined());
    }
}
