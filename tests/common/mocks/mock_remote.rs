use async_trait::async_trait;
use offline_first_lib::application::ports::EntityHandler;
use offline_first_lib::domain::value_objects::{EntityKind, IdempotencyKey};
use offline_first_lib::shared::error::OperationError;
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoteMode {
    #[default]
    Accept,
    Reject,
    Unreachable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RemoteCall {
    pub operation: &'static str,
    pub id: Option<String>,
    pub data: Value,
    pub idempotency_key: String,
}

#[derive(Debug, Default)]
struct MockRemoteState {
    mode: RemoteMode,
    calls: Vec<RemoteCall>,
    next_id: u32,
}

#[derive(Debug, Clone)]
pub struct MockEntityHandler {
    kind: EntityKind,
    state: Arc<RwLock<MockRemoteState>>,
}

impl MockEntityHandler {
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            state: Arc::new(RwLock::new(MockRemoteState::default())),
        }
    }

    pub async fn set_mode(&self, mode: RemoteMode) {
        self.state.write().await.mode = mode;
    }

    pub async fn calls(&self) -> Vec<RemoteCall> {
        self.state.read().await.calls.clone()
    }

    async fn record(
        &self,
        operation: &'static str,
        id: Option<&str>,
        data: &Value,
        key: &IdempotencyKey,
    ) -> Result<(), OperationError> {
        let mut state = self.state.write().await;
        state.calls.push(RemoteCall {
            operation,
            id: id.map(str::to_string),
            data: data.clone(),
            idempotency_key: key.as_str().to_string(),
        });
        match state.mode {
            RemoteMode::Accept => Ok(()),
            RemoteMode::Reject => Err(OperationError::Rejected(format!(
                "{} {operation} rejected",
                self.kind
            ))),
            RemoteMode::Unreachable => Err(OperationError::Unreachable(
                "connection refused".to_string(),
            )),
        }
    }
}

#[async_trait]
impl EntityHandler for MockEntityHandler {
    fn kind(&self) -> EntityKind {
        self.kind.clone()
    }

    async fn create(&self, data: &Value, key: &IdempotencyKey) -> Result<Value, OperationError> {
        self.record("create", None, data, key).await?;
        let mut state = self.state.write().await;
        state.next_id += 1;
        let mut body = data.clone();
        body["id"] = json!(format!("srv-{}-{}", self.kind, state.next_id));
        Ok(body)
    }

    async fn update(
        &self,
        id: &str,
        data: &Value,
        key: &IdempotencyKey,
    ) -> Result<Value, OperationError> {
        self.record("update", Some(id), data, key).await?;
        let mut body = data.clone();
        body["id"] = json!(id);
        Ok(body)
    }

    async fn delete(&self, id: &str, key: &IdempotencyKey) -> Result<(), OperationError> {
        self.record("delete", Some(id), &Value::Null, key).await
    }
}
