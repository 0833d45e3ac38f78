//! Push notification display and notification clicks.

use haven_core::{NotificationConfig, WorkerConfig};
use serde::{Deserialize, Serialize};

use crate::outcome::{Effect, Outcome};

/// Action id of the primary "open the app" button.
pub const ACTION_EXPLORE: &str = "explore";
/// Action id of the dismiss button.
pub const ACTION_CLOSE: &str = "close";

/// A notification for the host to display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub options: NotificationOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    /// Unix milliseconds.
    pub date_of_arrival: i64,
    pub primary_key: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    pub icon: String,
}

impl Notification {
    /// Build the fixed-shape notification for a push payload.
    pub fn for_push(config: &NotificationConfig, payload: Option<&str>, arrived_at_ms: i64) -> Self {
        let action = |action: &str, title: &str| NotificationAction {
            action: action.into(),
            title: title.into(),
            icon: config.icon.clone(),
        };

        Self {
            title: config.title.clone(),
            options: NotificationOptions {
                body: payload.map_or_else(|| config.default_body.clone(), str::to_string),
                icon: config.icon.clone(),
                badge: config.badge.clone(),
                vibrate: config.vibrate.clone(),
                data: NotificationData { date_of_arrival: arrived_at_ms, primary_key: 1 },
                actions: vec![action(ACTION_EXPLORE, "Open"), action(ACTION_CLOSE, "Dismiss")],
            },
        }
    }
}

/// Show a notification for a received push.
pub fn handle_push(config: &WorkerConfig, payload: Option<&str>) -> Outcome {
    tracing::info!(has_payload = payload.is_some(), "push received");
    let notification = Notification::for_push(&config.notification, payload, chrono::Utc::now().timestamp_millis());
    Outcome::effects(vec![Effect::ShowNotification { notification }])
}

/// Close the clicked notification; the primary action also brings up the app.
pub fn handle_notification_click(config: &WorkerConfig, action: &str) -> Outcome {
    tracing::info!(action, "notification clicked");

    let mut effects = vec![Effect::CloseNotification];
    if action == ACTION_EXPLORE {
        effects.push(Effect::FocusOrOpenWindow { url: config.notification.app_url.clone() });
    }
    Outcome::effects(effects)
}
