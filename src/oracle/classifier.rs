//! Anomaly Classifier - Turns an aggregate into a verdict
//!
//! Decision table, first match wins:
//! 1. fewer successful quotes than the quorum -> Inconclusive
//! 2. median missing or not positive          -> Inconclusive
//! 3. max deviation above threshold           -> Anomalous
//! 4. otherwise                               -> Normal

use chrono::Utc;
use uuid::Uuid;

use crate::oracle::aggregator::AggregateResult;
use crate::types::{SourceId, Verdict, VerdictStatus};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyClassifier {
    threshold: f64,
    min_quorum: usize,
}

impl AnomalyClassifier {
    pub fn new(threshold: f64, min_quorum: usize) -> Self {
        Self {
            threshold,
            min_quorum,
        }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn min_quorum(&self) -> usize {
        self.min_quorum
    }

    /// Classify one cycle. `failed_sources` is left empty for the caller
    /// to fill in.
    pub fn classify(&self, result: &AggregateResult) -> Verdict {
        let (status, offending_sources, detail) = self.decide(result);

        Verdict {
            cycle_id: Uuid::new_v4(),
            evaluated_at: Utc::now(),
            status,
            median: result.median,
            max_deviation: result.max_deviation,
            spread: result.spread,
            offending_sources,
            failed_sources: Vec::new(),
            successful_count: result.successful_count,
            total_count: result.total_count,
            detail,
        }
    }

    fn decide(&self, result: &AggregateResult) -> (VerdictStatus, Vec<SourceId>, String) {
        if result.successful_count < self.min_quorum {
            return (
                VerdictStatus::Inconclusive,
                Vec::new(),
                format!(
                    "Insufficient live sources: {} of {} responded, {} required to judge",
                    result.successful_count, result.total_count, self.min_quorum
                ),
            );
        }

        let (median, max_deviation) = match (result.median, result.max_deviation) {
            (Some(m), Some(d)) if m.is_finite() && m > 0.0 => (m, d),
            (median, _) => {
                return (
                    VerdictStatus::Inconclusive,
                    Vec::new(),
                    format!(
                        "Degenerate aggregate: median {} leaves deviation undefined",
                        median.map_or_else(|| "n/a".to_string(), |m| m.to_string())
                    ),
                );
            }
        };

        if max_deviation > self.threshold {
            let offending = result.sources_above(self.threshold);
            let detail = if result.successful_count == 2 {
                format!(
                    "ALERT: Price deviation {:.1}% detected (threshold {:.1}%) around median {}; \
                     only 2 live sources, cannot tell which feed is faulty",
                    max_deviation * 100.0,
                    self.threshold * 100.0,
                    median
                )
            } else {
                format!(
                    "ALERT: Price deviation {:.1}% detected (threshold {:.1}%) around median {} from {}",
                    max_deviation * 100.0,
                    self.threshold * 100.0,
                    median,
                    join_ids(&offending)
                )
            };
            return (VerdictStatus::Anomalous, offending, detail);
        }

        (
            VerdictStatus::Normal,
            Vec::new(),
            format!(
                "Normal price activity: max deviation {:.2}% within {:.1}% across {} of {} sources",
                max_deviation * 100.0,
                self.threshold * 100.0,
                result.successful_count,
                result.total_count
            ),
        )
    }
}

fn join_ids(ids: &[SourceId]) -> String {
    ids.iter()
        .map(SourceId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
