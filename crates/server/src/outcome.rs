//! What a handled event asks of the host.
//!
//! Handlers never touch clients, windows, or the notification tray
//! themselves; they describe those side effects and the host performs them.

use haven_core::{Error, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::handlers::push::Notification;

/// Result of one event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Set only for fetch events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fetch: Option<FetchDecision>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub effects: Vec<Effect>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<Report>,
}

impl Outcome {
    pub fn fetch(decision: FetchDecision) -> Self {
        Self { fetch: Some(decision), ..Default::default() }
    }

    pub fn effects(effects: Vec<Effect>) -> Self {
        Self { effects, ..Default::default() }
    }
}

/// How an intercepted request is answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum FetchDecision {
    /// Not intercepted; the host performs the request untouched.
    Passthrough,
    Respond { source: ResponseSource, response: Response },
    /// No response could be produced; the failure reaches the page as-is.
    Failed { code: i32, message: String },
}

impl FetchDecision {
    pub fn respond(source: ResponseSource, response: Response) -> Self {
        FetchDecision::Respond { source, response }
    }

    pub fn failed(error: &Error) -> Self {
        FetchDecision::Failed { code: error.code(), message: error.to_string() }
    }

    pub fn source(&self) -> Option<ResponseSource> {
        match self {
            FetchDecision::Respond { source, .. } => Some(*source),
            _ => None,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            FetchDecision::Respond { response, .. } => Some(response),
            _ => None,
        }
    }
}

/// Where a served response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    Cache,
    Network,
    /// Cached root document served to a failed navigation.
    RootDocument,
    OfflinePage,
    /// Cache entry found on the last-resort lookup after a network failure.
    FallbackCache,
}

/// A side effect the host performs on the worker's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Activate now instead of waiting for older instances to finish.
    SkipWaiting,
    /// Take control of every open application instance without a reload.
    ClaimClients,
    PostMessage { target: Target, message: Value },
    ShowNotification { notification: Notification },
    CloseNotification,
    FocusOrOpenWindow { url: String },
}

/// Recipient of a posted message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    AllClients,
    /// A reply port handed over with an inbound message.
    Port(u64),
}

/// Lifecycle summary returned with install and activate outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Report {
    Install { cached: Vec<String>, failed: Vec<FailedEntry> },
    Activate { deleted: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEntry {
    pub url: String,
    pub reason: String,
}
