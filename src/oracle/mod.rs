//! Oracle module - Multi-source price anomaly detection
//!
//! Collects one quote per source concurrently, aggregates them around the
//! median and classifies the spread into a verdict.

mod aggregator;
mod classifier;
mod collector;
pub mod sources;

pub use aggregator::{calculate_median, AggregateResult, RobustAggregator};
pub use classifier::AnomalyClassifier;
pub use collector::{is_valid_price, QuoteCollector, SourceEntry};
