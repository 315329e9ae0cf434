use crate::domain::value_objects::{RawActionId, RetryState};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A raw HTTP write that failed at the network layer and waits for replay.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawAction {
    pub id: RawActionId,
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub retries: u32,
    pub error: Option<String>,
    pub retry_state: RetryState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawActionDraft {
    pub url: String,
    pub method: String,
    pub headers: BTreeMap<String, String>,
    pub body: Option<String>,
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawActionPatch {
    pub retries: Option<u32>,
    pub error: Option<Option<String>>,
    pub retry_state: Option<RetryState>,
}

/// Entry of the legacy queue: a JSON array stored under a reserved cache key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LegacyQueuedRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl From<LegacyQueuedRequest> for RawActionDraft {
    fn from(legacy: LegacyQueuedRequest) -> Self {
        Self {
            url: legacy.url,
            method: legacy.method.to_ascii_uppercase(),
            headers: legacy.headers,
            body: legacy.body,
            timestamp: legacy
                .timestamp
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        }
    }
}
