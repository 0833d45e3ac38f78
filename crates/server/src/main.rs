//! haven-worker entry point.
//!
//! Boots the offline-support worker and serves host events over stdio.
//! Logging goes to stderr to keep stdout free for reply frames.

use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use haven_client::{FetchClient, FetchConfig};
use haven_core::{CacheDb, WorkerConfig};
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

mod bridge;
mod error;
mod events;
mod handler;
mod handlers;
mod outcome;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "worker panicked");
    }));

    let config = Arc::new(WorkerConfig::load().context("loading worker configuration")?);
    tracing::info!(
        origin = %config.origin,
        static_cache = %config.static_cache_name,
        dynamic_cache = %config.dynamic_cache_name,
        "starting haven-worker on stdio"
    );

    let cache = CacheDb::open(&config.db_path)
        .await
        .map_err(|e| anyhow!("opening cache database {}: {e}", config.db_path.display()))?;

    let fetch_config = FetchConfig::from_worker(&config)?;
    let network = Arc::new(FetchClient::new(fetch_config)?);

    let worker = handler::Worker::new(config, cache, network)?;
    let stats = bridge::run(worker, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    tracing::info!(frames = stats.frames, peak_in_flight = stats.peak_in_flight, "haven-worker stopped");
    Ok(())
}
