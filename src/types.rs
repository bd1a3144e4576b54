//! Core types used throughout the sentinel
//!
//! Defines source identifiers, quotes, per-source outcomes and verdicts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier for a price source. Used for reporting only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SourceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A validated price reading from one source in one cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub source_id: SourceId,
    /// Always positive and finite
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    /// Time the adapter took to answer
    pub latency_ms: u64,
}

/// Why a source produced no quote this cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    SourceError,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Timeout => write!(f, "TIMEOUT"),
            FailureReason::SourceError => write!(f, "SOURCE_ERROR"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub source_id: SourceId,
    pub reason: FailureReason,
    pub message: String,
}

/// Exactly one per configured source per cycle
#[derive(Debug, Clone, PartialEq)]
pub enum QuoteOutcome {
    Quote(Quote),
    Failure(Failure),
}

impl QuoteOutcome {
    pub fn source_id(&self) -> &SourceId {
        match self {
            QuoteOutcome::Quote(q) => &q.source_id,
            QuoteOutcome::Failure(f) => &f.source_id,
        }
    }

    pub fn quote(&self) -> Option<&Quote> {
        match self {
            QuoteOutcome::Quote(q) => Some(q),
            QuoteOutcome::Failure(_) => None,
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            QuoteOutcome::Quote(_) => None,
            QuoteOutcome::Failure(f) => Some(f),
        }
    }

    pub fn is_quote(&self) -> bool {
        matches!(self, QuoteOutcome::Quote(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStatus {
    Normal,
    Anomalous,
    /// Not a statement that prices are fine: too little data to judge
    Inconclusive,
}

impl fmt::Display for VerdictStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerdictStatus::Normal => write!(f, "NORMAL"),
            VerdictStatus::Anomalous => write!(f, "ANOMALOUS"),
            VerdictStatus::Inconclusive => write!(f, "INCONCLUSIVE"),
        }
    }
}

/// Terminal output of one detection cycle
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub cycle_id: Uuid,
    pub evaluated_at: DateTime<Utc>,
    pub status: VerdictStatus,
    /// Consensus price, when at least one quote arrived
    pub median: Option<f64>,
    /// Largest relative deviation from the median, when it is defined
    pub max_deviation: Option<f64>,
    /// `(max - min) / min` across successful quotes
    pub spread: f64,
    /// Sources whose deviation exceeds the threshold, in source-id order
    pub offending_sources: Vec<SourceId>,
    pub failed_sources: Vec<Failure>,
    pub successful_count: usize,
    pub total_count: usize,
    pub detail: String,
}

impl Verdict {
    pub fn is_anomalous(&self) -> bool {
        self.status == VerdictStatus::Anomalous
    }

    pub fn is_inconclusive(&self) -> bool {
        self.status == VerdictStatus::Inconclusive
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.detail)
    }
}
