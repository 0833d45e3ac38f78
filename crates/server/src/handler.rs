//! Worker handle and event dispatch.
//!
//! This module defines the worker that routes each platform event to its
//! handler and turns handler failures into logged, empty outcomes.

use std::sync::Arc;

use haven_client::Network;
use haven_core::{CacheDb, Error, WorkerConfig};
use url::Url;

use crate::events::{Event, EventKind};
use crate::handlers::{intercept, lifecycle, message, push, sync};
use crate::outcome::{FetchDecision, Outcome};

/// Everything a handler may read: immutable configuration, the cache
/// storage handle, and the network. Cloning is cheap.
#[derive(Clone)]
pub struct Worker {
    config: Arc<WorkerConfig>,
    origin: Url,
    cache: CacheDb,
    network: Arc<dyn Network>,
}

impl Worker {
    /// Create a worker over an already opened cache database.
    pub fn new(config: Arc<WorkerConfig>, cache: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { config, origin, cache, network })
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Application origin that relative URLs resolve against.
    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn cache(&self) -> &CacheDb {
        &self.cache
    }

    pub fn network(&self) -> &dyn Network {
        self.network.as_ref()
    }

    /// Handle one event. Never fails: errors are logged and reported as an
    /// empty outcome, or a `failed` decision for fetch events.
    pub async fn dispatch(&self, event: Event) -> Outcome {
        let kind = event.kind();
        tracing::debug!(%kind, "dispatching event");

        let result = match event {
            Event::Install => lifecycle::install(self).await,
            Event::Activate => lifecycle::activate(self).await,
            Event::Fetch { request } => Ok(Outcome::fetch(intercept::intercept(self, request).await)),
            Event::Message { data, ports } => Ok(message::handle_message(self.config(), data, &ports)),
            Event::Sync { tag } => Ok(sync::handle_sync(self, &tag).await),
            Event::Storage { key, value } => sync::handle_storage(self, &key, value.as_deref()).await,
            Event::Push { data } => Ok(push::handle_push(self.config(), data.as_deref())),
            Event::NotificationClick { action } => Ok(push::handle_notification_click(self.config(), &action)),
            Event::Error { message } => {
                tracing::error!(%message, "uncaught worker error");
                Ok(Outcome::default())
            }
            Event::UnhandledRejection { reason } => {
                tracing::error!(%reason, "unhandled promise rejection");
                Ok(Outcome::default())
            }
        };

        result.unwrap_or_else(|e| {
            tracing::error!(%kind, error = %e, "event handler failed");
            Self::aborted(kind, &e)
        })
    }

    /// Outcome reported when a handler could not finish.
    pub fn aborted(kind: EventKind, error: &Error) -> Outcome {
        match kind {
            EventKind::Fetch => Outcome::fetch(FetchDecision::failed(error)),
            _ => Outcome::default(),
        }
    }
}
