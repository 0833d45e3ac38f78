//! Background sync and the host-mirrored backup records it reads.
//!
//! The worker never talks to the remote database. On a sync trigger it hands
//! the locally held backup records to every open application instance, and
//! those instances persist them. Failures are logged and left to the
//! platform's own sync retry.

use haven_core::Error;

use super::message::WorkerMessage;
use crate::handler::Worker;
use crate::outcome::{Effect, Outcome, Target};

/// Handle a background sync trigger.
pub async fn handle_sync(worker: &Worker, tag: &str) -> Outcome {
    tracing::info!(tag, "background sync");

    if tag != worker.config().sync_tag {
        tracing::debug!(tag, "ignoring sync tag");
        return Outcome::default();
    }

    match reconcile(worker).await {
        Ok(outcome) => {
            tracing::info!("background sync complete");
            outcome
        }
        Err(e) => {
            tracing::error!(error = %e, "background sync failed");
            Outcome::default()
        }
    }
}

async fn reconcile(worker: &Worker) -> Result<Outcome, Error> {
    let records = worker.cache().get_records(&worker.config().backup_storage_key).await?;
    if records.is_empty() {
        return Ok(Outcome::default());
    }

    tracing::info!(count = records.len(), "broadcasting local records to reconcile");
    let message = serde_json::to_value(WorkerMessage::SyncLocalData { data: records })?;

    Ok(Outcome::effects(vec![Effect::PostMessage { target: Target::AllClients, message }]))
}

/// Mirror a page local storage write. `None` removes the key.
pub async fn handle_storage(worker: &Worker, key: &str, value: Option<&str>) -> Result<Outcome, Error> {
    match value {
        Some(value) => worker.cache().set_item(key, value).await?,
        None => {
            worker.cache().remove_item(key).await?;
        }
    }
    tracing::debug!(key, removed = value.is_none(), "local storage mirrored");
    Ok(Outcome::default())
}
