//! Price source adapters
//!
//! The engine only needs the `fetch` capability; transport, auth and retry
//! policy belong to the adapter.

mod http;

pub use http::HttpJsonSource;

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;

use crate::types::SourceId;

/// Trait for price source adapters
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Short adapter kind, used in logs
    fn name(&self) -> &'static str {
        "custom"
    }

    /// Produce a single price for `source_id`
    async fn fetch(&self, source_id: &SourceId) -> Result<f64>;
}

/// Always answers with the same value
#[derive(Debug, Clone, Copy)]
pub struct StaticSource {
    value: f64,
}

impl StaticSource {
    pub fn new(value: f64) -> Self {
        Self { value }
    }
}

#[async_trait]
impl PriceSource for StaticSource {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn fetch(&self, _source_id: &SourceId) -> Result<f64> {
        Ok(self.value)
    }
}

/// Adapts an async closure into a `PriceSource`
pub struct FnSource<F> {
    f: F,
}

impl<F, Fut> FnSource<F>
where
    F: Fn(SourceId) -> Fut + Send + Sync,
    Fut: Future<Output = Result<f64>> + Send + 'static,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> PriceSource for FnSource<F>
where
    F: Fn(SourceId) -> Fut + Send + Sync,
    Fut: Future<Output = Result<f64>> + Send + 'static,
{
    fn name(&self) -> &'static str {
        "fn"
    }

    async fn fetch(&self, source_id: &SourceId) -> Result<f64> {
        (self.f)(source_id.clone()).await
    }
}
