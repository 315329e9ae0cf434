use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const ACTION_VIEW: &str = "view";
pub const ACTION_CLOSE: &str = "close";
pub const DEFAULT_VIBRATION: [u32; 3] = [100, 50, 100];

/// Inbound push message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub primary_key: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationData {
    pub date_of_arrival: DateTime<Utc>,
    pub primary_key: Option<Value>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationDescriptor {
    pub title: String,
    pub body: String,
    pub icon: Option<String>,
    pub badge: Option<String>,
    pub vibrate: Vec<u32>,
    pub actions: Vec<NotificationAction>,
    pub data: NotificationData,
}

impl NotificationDescriptor {
    pub fn from_payload(
        payload: PushPayload,
        icon: Option<String>,
        badge: Option<String>,
        received_at: DateTime<Utc>,
    ) -> Self {
        Self {
            title: payload.title,
            body: payload.body,
            icon,
            badge,
            vibrate: DEFAULT_VIBRATION.to_vec(),
            actions: vec![
                NotificationAction {
                    action: ACTION_VIEW.to_string(),
                    title: "View".to_string(),
                },
                NotificationAction {
                    action: ACTION_CLOSE.to_string(),
                    title: "Close".to_string(),
                },
            ],
            data: NotificationData {
                date_of_arrival: received_at,
                primary_key: payload.primary_key,
                url: payload.url,
            },
        }
    }
}
