//! Messages exchanged with application instances.

use haven_core::{Error, WorkerConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::outcome::{Effect, Outcome, Target};

/// Control messages an application instance may post to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    SkipWaiting,
    GetVersion,
}

impl ClientMessage {
    pub fn parse(data: Value) -> Result<Self, Error> {
        serde_json::from_value(data).map_err(|e| Error::InvalidMessage(e.to_string()))
    }
}

/// Messages the worker posts to application instances.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerMessage {
    /// Backup records the instances should persist remotely.
    SyncLocalData { data: Vec<Value> },
}

/// Handle an inbound message. Unrecognized messages are ignored.
pub fn handle_message(config: &WorkerConfig, data: Value, ports: &[u64]) -> Outcome {
    tracing::debug!(message = %data, "message received");

    let message = match ClientMessage::parse(data) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring unrecognized message");
            return Outcome::default();
        }
    };

    match message {
        ClientMessage::SkipWaiting => Outcome::effects(vec![Effect::SkipWaiting]),
        ClientMessage::GetVersion => {
            let Some(&port) = ports.first() else {
                tracing::warn!("GET_VERSION without a reply port");
                return Outcome::default();
            };
            let reply = serde_json::json!({ "version": config.dynamic_cache_name });
            Outcome::effects(vec![Effect::PostMessage { target: Target::Port(port), message: reply }])
        }
    }
}
