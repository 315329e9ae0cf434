use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct EntityMirrorRow {
    pub kind: String,
    pub id: String,
    pub data: String,
    pub status: Option<String>,
    pub created_at: Option<i64>,
    pub updated_at: i64,
    pub deleted_at: Option<i64>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PendingOperationRow {
    pub id: i64,
    pub operation_type: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub data: String,
    pub timestamp: i64,
    pub retries: i64,
    pub error: Option<String>,
    pub retry_state: String,
    pub next_attempt_at: Option<i64>,
    pub dead_letter_reason: Option<String>,
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SyncMetadataRow {
    pub key: String,
    pub last_sync: Option<i64>,
    pub status: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct RawActionRow {
    pub id: i64,
    pub url: String,
    pub method: String,
    pub headers: String,
    pub body: Option<String>,
    pub timestamp: i64,
    pub retries: i64,
    pub error: Option<String>,
    pub retry_state: String,
    pub next_attempt_at: Option<i64>,
    pub dead_letter_reason: Option<String>,
}
