//! Price Sentinel Library
//!
//! Multi-source price anomaly detection: concurrent quote collection,
//! median consensus and quorum-aware verdicts.

pub mod config;
pub mod error;
pub mod oracle;
pub mod sentinel;
pub mod types;

pub use error::ConfigError;
pub use oracle::sources::{FnSource, HttpJsonSource, PriceSource, StaticSource};
pub use oracle::{AggregateResult, AnomalyClassifier, QuoteCollector, RobustAggregator, SourceEntry};
pub use sentinel::{Sentinel, SentinelConfig};
pub use types::{Failure, FailureReason, Quote, QuoteOutcome, SourceId, Verdict, VerdictStatus};
