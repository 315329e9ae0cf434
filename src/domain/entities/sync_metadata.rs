use crate::domain::value_objects::SyncState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncMetadataRecord {
    pub key: String,
    pub last_sync: Option<DateTime<Utc>>,
    pub status: SyncState,
}

impl SyncMetadataRecord {
    pub fn new(key: impl Into<String>, status: SyncState, last_sync: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            last_sync: Some(last_sync),
            status,
        }
    }
}
