//! Install and activate handlers.
//!
//! Install pre-populates the static store from the manifest with bounded
//! concurrency; every entry succeeds or fails on its own. Activate retires
//! every store that is not one of the two current version tags.

use std::sync::Arc;

use haven_client::resolve;
use haven_core::{CacheKey, Error, Request};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::handler::Worker;
use crate::outcome::{Effect, FailedEntry, Outcome, Report};

/// Manifest entry that is never pre-cached.
const ROOT_PATH: &str = "/";

/// Pre-cache the manifest into the static store, then ask to skip waiting.
pub async fn install(worker: &Worker) -> Result<Outcome, Error> {
    let config = worker.config();
    tracing::info!(cache = %config.static_cache_name, "installing worker");

    worker.cache().open_cache(&config.static_cache_name).await?;

    let manifest: Vec<String> = config
        .precache_manifest
        .iter()
        .filter(|entry| entry.trim() != ROOT_PATH)
        .cloned()
        .collect();

    let semaphore = Arc::new(Semaphore::new(config.install_concurrency));
    let mut join_set = JoinSet::new();

    for (index, entry) in manifest.iter().enumerate() {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let worker = worker.clone();
        let entry = entry.clone();

        join_set.spawn(async move {
            let _permit = permit;
            let result = precache_entry(&worker, &entry).await;
            (index, entry, result)
        });
    }

    let mut results = Vec::with_capacity(manifest.len());
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => tracing::error!(error = %e, "pre-cache task aborted"),
        }
    }
    results.sort_by_key(|(index, _, _)| *index);

    let mut cached = Vec::new();
    let mut failed = Vec::new();
    for (_, url, result) in results {
        match result {
            Ok(()) => cached.push(url),
            Err(e) => {
                tracing::error!(url = %url, error = %e, "failed to pre-cache manifest entry");
                failed.push(FailedEntry { url, reason: e.to_string() });
            }
        }
    }

    tracing::info!(cached = cached.len(), failed = failed.len(), "worker installed");

    Ok(Outcome {
        effects: vec![Effect::SkipWaiting],
        report: Some(Report::Install { cached, failed }),
        ..Default::default()
    })
}

/// Fetch one manifest URL and store it in the static store.
async fn precache_entry(worker: &Worker, entry: &str) -> Result<(), Error> {
    let url = resolve(worker.origin(), entry).map_err(|e| Error::InvalidUrl(format!("{entry}: {e}")))?;
    let response = worker.network().fetch(&Request::get(url.as_str())).await?;

    if !response.ok() {
        return Err(Error::HttpError(format!("status {}", response.status)));
    }

    worker.cache().put(&worker.config().static_cache_name, &CacheKey::get(&url), &response).await
}

/// Delete superseded stores, then claim every open application instance.
pub async fn activate(worker: &Worker) -> Result<Outcome, Error> {
    let config = worker.config();
    tracing::info!("activating worker");

    let mut deleted = Vec::new();
    for name in worker.cache().cache_names().await? {
        if config.is_current_cache(&name) {
            continue;
        }
        if worker.cache().delete_cache(&name).await? {
            tracing::info!(cache = %name, "deleted superseded cache");
            deleted.push(name);
        }
    }

    tracing::info!(deleted = deleted.len(), "worker activated");

    Ok(Outcome {
        effects: vec![Effect::ClaimClients],
        report: Some(Report::Activate { deleted }),
        ..Default::default()
    })
}
