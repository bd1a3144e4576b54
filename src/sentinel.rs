//! Sentinel - Detection facade
//!
//! Owns the validated configuration and runs collect -> aggregate ->
//! classify as one cycle. Configuration is read-only after construction,
//! so `detect_anomaly` can be called from many tasks at once.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::ConfigError;
use crate::oracle::{AnomalyClassifier, QuoteCollector, RobustAggregator, SourceEntry};
use crate::types::{Verdict, VerdictStatus};

/// Sentinel configuration
#[derive(Debug, Clone)]
pub struct SentinelConfig {
    /// Relative deviation that triggers an alert (e.g., 0.05 = 5%)
    pub threshold: f64,
    /// Deadline applied to each source independently
    pub per_source_timeout: Duration,
    /// Minimum successful sources required to judge
    pub min_quorum: usize,
    /// Sources in declaration order
    pub sources: Vec<SourceEntry>,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            threshold: 0.05,
            per_source_timeout: Duration::from_secs(2),
            min_quorum: 2,
            sources: Vec::new(),
        }
    }
}

impl SentinelConfig {
    pub fn with_sources(sources: Vec<SourceEntry>) -> Self {
        Self {
            sources,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.threshold.is_finite() && self.threshold > 0.0) {
            return Err(ConfigError::InvalidThreshold(self.threshold));
        }
        if self.per_source_timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.min_quorum < 1 {
            return Err(ConfigError::InvalidQuorum(self.min_quorum));
        }
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.min_quorum > self.sources.len() {
            return Err(ConfigError::QuorumExceedsSources {
                min_quorum: self.min_quorum,
                sources: self.sources.len(),
            });
        }

        let mut seen = HashSet::new();
        for entry in &self.sources {
            if !seen.insert(&entry.id) {
                return Err(ConfigError::DuplicateSource(entry.id.clone()));
            }
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct Sentinel {
    sources: Vec<SourceEntry>,
    collector: QuoteCollector,
    aggregator: RobustAggregator,
    classifier: AnomalyClassifier,
}

impl Sentinel {
    /// Validate `config` and build the pipeline. Fails fast on
    /// misconfiguration; after this, every cycle returns a verdict.
    pub fn new(config: SentinelConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        tracing::info!(
            sources = config.sources.len(),
            threshold = config.threshold,
            timeout_ms = config.per_source_timeout.as_millis() as u64,
            min_quorum = config.min_quorum,
            "Sentinel configured"
        );

        Ok(Self {
            collector: QuoteCollector::new(config.per_source_timeout),
            aggregator: RobustAggregator::new(),
            classifier: AnomalyClassifier::new(config.threshold, config.min_quorum),
            sources: config.sources,
        })
    }

    pub fn sources(&self) -> &[SourceEntry] {
        &self.sources
    }

    pub fn threshold(&self) -> f64 {
        self.classifier.threshold()
    }

    pub fn min_quorum(&self) -> usize {
        self.classifier.min_quorum()
    }

    /// Run one detection cycle
    pub async fn detect_anomaly(&self) -> Verdict {
        let outcomes = self.collector.collect(&self.sources).await;
        let aggregate = self.aggregator.aggregate_outcomes(&outcomes);

        let failed_sources = outcomes
            .iter()
            .filter_map(|o| o.failure().cloned())
            .collect();

        let verdict = Verdict {
            failed_sources,
            ..self.classifier.classify(&aggregate)
        };

        match verdict.status {
            VerdictStatus::Normal => tracing::info!(
                cycle_id = %verdict.cycle_id,
                median = ?verdict.median,
                max_deviation = ?verdict.max_deviation,
                spread = verdict.spread,
                live = verdict.successful_count,
                "Normal price activity"
            ),
            VerdictStatus::Anomalous => tracing::warn!(
                cycle_id = %verdict.cycle_id,
                median = ?verdict.median,
                max_deviation = ?verdict.max_deviation,
                spread = verdict.spread,
                offending = ?verdict.offending_sources,
                "🚨 Price anomaly detected"
            ),
            VerdictStatus::Inconclusive => tracing::warn!(
                cycle_id = %verdict.cycle_id,
                live = verdict.successful_count,
                total = verdict.total_count,
                detail = %verdict.detail,
                "Inconclusive cycle"
            ),
        }

        verdict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::sources::StaticSource;
    use crate::types::SourceId;
    use std::sync::Arc;

    fn sources(values: &[f64]) -> Vec<SourceEntry> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| SourceEntry::new(format!("src-{}", i), Arc::new(StaticSource::new(*v))))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = SentinelConfig::default();
        assert_eq!(config.threshold, 0.05);
        assert_eq!(config.min_quorum, 2);
        assert_eq!(config.validate(), Err(ConfigError::NoSources));
    }

    #[test]
    fn test_invalid_configs_fail_fast() {
        let base = SentinelConfig::with_sources(sources(&[1.0, 2.0]));

        let mut c = base.clone();
        c.threshold = 0.0;
        assert_eq!(c.validate(), Err(ConfigError::InvalidThreshold(0.0)));

        let mut c = base.clone();
        c.threshold = f64::NAN;
        assert!(matches!(c.validate(), Err(ConfigError::InvalidThreshold(_))));

        let mut c = base.clone();
        c.per_source_timeout = Duration::ZERO;
        assert_eq!(c.validate(), Err(ConfigError::InvalidTimeout));

        let mut c = base.clone();
        c.min_quorum = 0;
        assert_eq!(c.validate(), Err(ConfigError::InvalidQuorum(0)));

        let mut c = base.clone();
        c.min_quorum = 3;
        assert_eq!(
            c.validate(),
            Err(ConfigError::QuorumExceedsSources {
                min_quorum: 3,
                sources: 2
            })
        );

        let mut c = base;
        c.sources.push(c.sources[0].clone());
        c.min_quorum = 1;
        assert_eq!(
            c.validate(),
            Err(ConfigError::DuplicateSource(SourceId::from("src-0")))
        );
    }

    #[tokio::test]
    async fn test_detect_flags_outlier() {
        let sentinel = Sentinel::new(SentinelConfig::with_sources(sources(&[100.0, 102.0, 150.0]))).unwrap();
        let verdict = sentinel.detect_anomaly().await;

        assert!(verdict.is_anomalous());
        assert_eq!(verdict.median, Some(102.0));
        assert_eq!(verdict.offending_sources, vec![SourceId::from("src-2")]);
        assert!((verdict.spread - 0.5).abs() < 1e-12);
        assert!(verdict.failed_sources.is_empty());
    }
}
