//! Configuration management for the sentinel binary
//!
//! Loads from config files + environment variables via .env

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::oracle::sources::HttpJsonSource;
use crate::oracle::SourceEntry;
use crate::sentinel::{Sentinel, SentinelConfig};

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub sentinel: DetectionConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
    /// Price sources, in declaration order
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Relative deviation that triggers an alert (0.05 = 5%)
    pub threshold: f64,
    /// Per-source deadline in milliseconds
    pub per_source_timeout_ms: u64,
    /// Minimum successful sources required to judge
    pub min_quorum: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between cycles; 0 runs a single cycle and exits
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable output
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub id: String,
    /// REST endpoint returning JSON
    pub url: String,
    /// JSON pointer to the price field, e.g. "/price"
    pub pointer: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Config::builder()
            // Detection defaults
            .set_default("sentinel.threshold", 0.05)?
            .set_default("sentinel.per_source_timeout_ms", 2000)?
            .set_default("sentinel.min_quorum", 2)?
            // Monitor defaults
            .set_default("monitor.interval_secs", 0)?
            // Logging defaults
            .set_default("logging.json", false)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (SENTINEL_*)
            .add_source(Environment::with_prefix("SENTINEL").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Generate a one-line digest of the config for logging
    pub fn digest(&self) -> String {
        format!(
            "threshold={:.4} timeout_ms={} min_quorum={} sources={:?} interval_secs={}",
            self.sentinel.threshold,
            self.sentinel.per_source_timeout_ms,
            self.sentinel.min_quorum,
            self.sources.iter().map(|s| s.id.as_str()).collect::<Vec<_>>(),
            self.monitor.interval_secs
        )
    }

    /// Map onto the library config, building one HTTP adapter per source
    pub fn sentinel_config(&self) -> Result<SentinelConfig> {
        let sources = self
            .sources
            .iter()
            .map(|s| {
                let adapter = HttpJsonSource::new(s.url.clone(), s.pointer.clone())
                    .with_context(|| format!("Failed to build adapter for {}", s.id))?;
                Ok(SourceEntry::new(s.id.clone(), Arc::new(adapter)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(SentinelConfig {
            threshold: self.sentinel.threshold,
            per_source_timeout: Duration::from_millis(self.sentinel.per_source_timeout_ms),
            min_quorum: self.sentinel.min_quorum,
            sources,
        })
    }

    /// Build a validated sentinel from this configuration
    pub fn build_sentinel(&self) -> Result<Sentinel> {
        let sentinel = Sentinel::new(self.sentinel_config()?).context("Invalid sentinel configuration")?;
        Ok(sentinel)
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}
