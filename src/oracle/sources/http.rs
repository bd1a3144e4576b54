//! HTTP JSON price source
//!
//! Polls a REST endpoint and reads the price at a JSON pointer, e.g.
//! `/price` for `{"price": "64000.1"}` or `/data/0/last` for nested arrays.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use std::time::Duration;

use crate::oracle::sources::PriceSource;
use crate::types::SourceId;

/// Upper bound for a single request; the collector's per-source timeout
/// usually fires first.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct HttpJsonSource {
    client: reqwest::Client,
    url: String,
    pointer: String,
}

impl HttpJsonSource {
    pub fn new(url: impl Into<String>, pointer: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: url.into(),
            pointer: pointer.into(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PriceSource for HttpJsonSource {
    fn name(&self) -> &'static str {
        "http_json"
    }

    async fn fetch(&self, source_id: &SourceId) -> Result<f64> {
        tracing::debug!(
            source = %source_id,
            url = %self.url.split('?').next().unwrap_or(self.url.as_str()),
            "Fetching price"
        );

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch price for {}", source_id))?;

        if !response.status().is_success() {
            bail!("{} returned HTTP {}", source_id, response.status());
        }

        let body: serde_json::Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", source_id))?;

        extract_price(&body, &self.pointer)
    }
}

/// Read a price at `pointer`, accepting JSON numbers and numeric strings
fn extract_price(body: &serde_json::Value, pointer: &str) -> Result<f64> {
    let field = body
        .pointer(pointer)
        .ok_or_else(|| anyhow!("Field {} not found in response", pointer))?;

    match field {
        serde_json::Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| anyhow!("Field {} is not representable as f64", pointer)),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<f64>()
            .with_context(|| format!("Field {} is not numeric: {:?}", pointer, s)),
        other => bail!("Field {} has unexpected type: {}", pointer, other),
    }
}
