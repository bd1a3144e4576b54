//! Quote Collector - Concurrent fan-out to all configured sources
//!
//! Every adapter runs in its own task bounded by the per-source timeout.
//! Results are merged back in declaration order, one outcome per source,
//! regardless of completion order.

use chrono::Utc;
use futures_util::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::{AbortHandle, JoinError};
use tokio::time::error::Elapsed;

use crate::oracle::sources::PriceSource;
use crate::types::{Failure, FailureReason, Quote, QuoteOutcome, SourceId};

/// A configured source: identifier plus the adapter that prices it
#[derive(Clone)]
pub struct SourceEntry {
    pub id: SourceId,
    pub adapter: Arc<dyn PriceSource>,
}

impl SourceEntry {
    pub fn new(id: impl Into<SourceId>, adapter: Arc<dyn PriceSource>) -> Self {
        Self {
            id: id.into(),
            adapter,
        }
    }
}

impl fmt::Debug for SourceEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceEntry")
            .field("id", &self.id)
            .field("adapter", &self.adapter.name())
            .finish()
    }
}

type FetchResult = (Duration, Result<anyhow::Result<f64>, Elapsed>);

/// Aborts still-running fetch tasks if the collecting future is dropped
struct AbortOnDrop(Vec<AbortHandle>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QuoteCollector {
    per_source_timeout: Duration,
}

impl QuoteCollector {
    pub fn new(per_source_timeout: Duration) -> Self {
        Self { per_source_timeout }
    }

    /// Query every source concurrently. Never fails: a source that errors,
    /// times out, panics or returns a non-positive/non-finite price yields
    /// a `Failure` in its own slot.
    pub async fn collect(&self, sources: &[SourceEntry]) -> Vec<QuoteOutcome> {
        let timeout = self.per_source_timeout;

        let handles: Vec<_> = sources
            .iter()
            .map(|entry| {
                let id = entry.id.clone();
                let adapter = Arc::clone(&entry.adapter);
                tokio::spawn(async move {
                    let started = Instant::now();
                    let result = tokio::time::timeout(timeout, adapter.fetch(&id)).await;
                    (started.elapsed(), result)
                })
            })
            .collect();

        let _guard = AbortOnDrop(handles.iter().map(|h| h.abort_handle()).collect());
        let joined = join_all(handles).await;

        sources
            .iter()
            .zip(joined)
            .map(|(entry, result)| self.resolve(&entry.id, result))
            .collect()
    }

    fn resolve(&self, id: &SourceId, joined: Result<FetchResult, JoinError>) -> QuoteOutcome {
        let outcome = match joined {
            Err(e) => failure(
                id,
                FailureReason::SourceError,
                if e.is_panic() {
                    "adapter panicked".to_string()
                } else {
                    "fetch task cancelled".to_string()
                },
            ),
            Ok((_, Err(_))) => failure(
                id,
                FailureReason::Timeout,
                format!("no response within {}ms", self.per_source_timeout.as_millis()),
            ),
            Ok((_, Ok(Err(e)))) => failure(id, FailureReason::SourceError, format!("{:#}", e)),
            Ok((elapsed, Ok(Ok(value)))) => {
                if is_valid_price(value) {
                    QuoteOutcome::Quote(Quote {
                        source_id: id.clone(),
                        value,
                        timestamp: Utc::now(),
                        latency_ms: elapsed.as_millis() as u64,
                    })
                } else {
                    failure(
                        id,
                        FailureReason::SourceError,
                        format!("invalid price {}", value),
                    )
                }
            }
        };

        match &outcome {
            QuoteOutcome::Quote(q) => {
                tracing::debug!(source = %id, price = q.value, latency_ms = q.latency_ms, "Quote received");
            }
            QuoteOutcome::Failure(f) => {
                tracing::warn!(source = %id, reason = %f.reason, error = %f.message, "Source failed");
            }
        }

        outcome
    }
}

/// Prices must be positive and finite to enter aggregation
pub fn is_valid_price(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn failure(id: &SourceId, reason: FailureReason, message: String) -> QuoteOutcome {
    QuoteOutcome::Failure(Failure {
        source_id: id.clone(),
        reason,
        message,
    })
}
