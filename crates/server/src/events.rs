//! Platform events delivered by the host.

use haven_core::Request;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One platform event, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Event {
    Install,
    Activate,
    Fetch {
        request: Request,
    },
    /// A message posted by an application instance. `ports` are reply
    /// channel ids the host can route a response to.
    Message {
        data: Value,
        #[serde(default)]
        ports: Vec<u64>,
    },
    Sync {
        tag: String,
    },
    Push {
        /// Payload text; absent when the push carried no data.
        #[serde(default)]
        data: Option<String>,
    },
    NotificationClick {
        #[serde(default)]
        action: String,
    },
    /// The page wrote (or removed, with `value: null`) a local storage key.
    Storage {
        key: String,
        #[serde(default)]
        value: Option<String>,
    },
    /// An uncaught error the host observed in the worker context.
    Error {
        message: String,
    },
    UnhandledRejection {
        #[serde(default)]
        reason: Value,
    },
}

/// Dispatch key for an `Event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Install,
    Activate,
    Fetch,
    Message,
    Sync,
    Push,
    NotificationClick,
    Storage,
    Error,
    UnhandledRejection,
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Install => EventKind::Install,
            Event::Activate => EventKind::Activate,
            Event::Fetch { .. } => EventKind::Fetch,
            Event::Message { .. } => EventKind::Message,
            Event::Sync { .. } => EventKind::Sync,
            Event::Push { .. } => EventKind::Push,
            Event::NotificationClick { .. } => EventKind::NotificationClick,
            Event::Storage { .. } => EventKind::Storage,
            Event::Error { .. } => EventKind::Error,
            Event::UnhandledRejection { .. } => EventKind::UnhandledRejection,
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EventKind::Install => "install",
            EventKind::Activate => "activate",
            EventKind::Fetch => "fetch",
            EventKind::Message => "message",
            EventKind::Sync => "sync",
            EventKind::Push => "push",
            EventKind::NotificationClick => "notification_click",
            EventKind::Storage => "storage",
            EventKind::Error => "error",
            EventKind::UnhandledRejection => "unhandled_rejection",
        };
        f.write_str(name)
    }
}
