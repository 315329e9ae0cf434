use crate::domain::value_objects::EntityKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Local copy of a server-owned record. `data` holds the business fields as
/// the server last returned them (or as the UI optimistically wrote them).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityMirror {
    pub kind: EntityKind,
    pub id: String,
    pub data: Value,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl EntityMirror {
    pub fn new(kind: EntityKind, id: impl Into<String>, data: Value) -> Self {
        let status = data
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_string);
        Self {
            kind,
            id: id.into(),
            data,
            status,
            created_at: None,
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    /// Builds a mirror from the server-authoritative representation. The
    /// server must have assigned an `id` (string or integer).
    pub fn from_server(kind: EntityKind, response: &Value) -> Result<Self, String> {
        let object = response
            .as_object()
            .ok_or_else(|| "server representation must be a JSON object".to_string())?;
        let id = extract_id(object)
            .ok_or_else(|| format!("server representation of {kind} has no id"))?;

        let created_at = object
            .get("created_at")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));
        let deleted_at = object
            .get("deleted_at")
            .and_then(Value::as_str)
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc));

        let mut mirror = Self::new(kind, id, response.clone());
        mirror.created_at = created_at.or(Some(mirror.updated_at));
        mirror.deleted_at = deleted_at;
        Ok(mirror)
    }

    /// Shallow-merges `patch` into the business fields. Used for optimistic
    /// writes made before the remote call is attempted.
    pub fn apply_patch(&mut self, patch: &Value) {
        if let (Some(target), Some(source)) = (self.data.as_object_mut(), patch.as_object()) {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        } else {
            self.data = patch.clone();
        }
        if let Some(status) = self.data.get("status").and_then(Value::as_str) {
            self.status = Some(status.to_string());
        }
        self.updated_at = Utc::now();
    }

    pub fn mark_deleted(&mut self, at: DateTime<Utc>) {
        self.deleted_at = Some(at);
        self.updated_at = at;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

fn extract_id(object: &Map<String, Value>) -> Option<String> {
    match object.get("id")? {
        Value::String(id) if !id.trim().is_empty() => Some(id.clone()),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}
