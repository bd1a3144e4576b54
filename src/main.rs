//! Price Sentinel
//!
//! Polls every configured source, compares each against the median and
//! prints one JSON verdict per cycle.

use anyhow::{Context, Result};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use price_sentinel::config::AppConfig;
use price_sentinel::sentinel::Sentinel;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(config.logging.json);

    info!(config = %config.digest(), "🛡️ Starting price sentinel");

    let sentinel = config.build_sentinel()?;

    if config.monitor.interval_secs == 0 {
        run_cycle(&sentinel).await?;
        return Ok(());
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(config.monitor.interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => run_cycle(&sentinel).await?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

async fn run_cycle(sentinel: &Sentinel) -> Result<()> {
    let verdict = sentinel.detect_anomaly().await;
    let line = serde_json::to_string(&verdict).context("Failed to serialize verdict")?;
    println!("{}", line);
    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
