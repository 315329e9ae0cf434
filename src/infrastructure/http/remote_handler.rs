use crate::application::ports::EntityHandler;
use crate::domain::value_objects::{EntityKind, IdempotencyKey};
use crate::shared::config::RemoteConfig;
use crate::shared::error::{AppError, OperationError};
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// REST handler for one entity kind: `POST /{resource}`,
/// `PUT /{resource}/{id}`, `DELETE /{resource}/{id}`.
#[derive(Clone)]
pub struct HttpEntityHandler {
    client: reqwest::Client,
    kind: EntityKind,
    collection_url: String,
}

impl HttpEntityHandler {
    pub fn new(config: &RemoteConfig, kind: EntityKind, resource: &str) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("HTTP client: {e}")))?;
        Ok(Self::with_client(client, config, kind, resource))
    }

    pub fn with_client(
        client: reqwest::Client,
        config: &RemoteConfig,
        kind: EntityKind,
        resource: &str,
    ) -> Self {
        Self {
            client,
            kind,
            collection_url: format!(
                "{}/{}",
                config.base_url.trim_end_matches('/'),
                resource.trim_matches('/')
            ),
        }
    }

    /// One handler per known kind, on the plural resource path.
    pub fn for_known_kinds(config: &RemoteConfig) -> Result<Vec<Self>, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| AppError::ConfigurationError(format!("HTTP client: {e}")))?;
        Ok(EntityKind::KNOWN
            .iter()
            .map(|kind| {
                let resource = format!("{}s", kind.as_str());
                Self::with_client(client.clone(), config, kind.clone(), &resource)
            })
            .collect())
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url, id)
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Option<Value>, OperationError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = body.trim();
            return Err(OperationError::Rejected(if detail.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                format!("HTTP {}: {}", status.as_u16(), detail)
            }));
        }

        let bytes = response.bytes().await.map_err(map_transport_error)?;
        if bytes.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| OperationError::InvalidResponse(e.to_string()))
    }
}

fn map_transport_error(err: reqwest::Error) -> OperationError {
    if err.is_connect() || err.is_timeout() || err.is_request() {
        OperationError::Unreachable(err.to_string())
    } else if err.is_decode() {
        OperationError::InvalidResponse(err.to_string())
    } else {
        OperationError::Rejected(err.to_string())
    }
}

fn require_body(body: Option<Value>) -> Result<Value, OperationError> {
    body.ok_or_else(|| OperationError::InvalidResponse("empty response body".to_string()))
}

#[async_trait]
impl EntityHandler for HttpEntityHandler {
    fn kind(&self) -> EntityKind {
        self.kind.clone()
    }

    async fn create(&self, data: &Value, key: &IdempotencyKey) -> Result<Value, OperationError> {
        let request = self
            .client
            .post(&self.collection_url)
            .header(IDEMPOTENCY_HEADER, key.as_str())
            .json(data);
        require_body(self.send(request).await?)
    }

    async fn update(
        &self,
        id: &str,
        data: &Value,
        key: &IdempotencyKey,
    ) -> Result<Value, OperationError> {
        let request = self
            .client
            .put(self.item_url(id))
            .header(IDEMPOTENCY_HEADER, key.as_str())
            .json(data);
        require_body(self.send(request).await?)
    }

    async fn delete(&self, id: &str, key: &IdempotencyKey) -> Result<(), OperationError> {
        let request = self
            .client
            .delete(self.item_url(id))
            .header(IDEMPOTENCY_HEADER, key.as_str());
        self.send(request).await.map(|_| ())
    }
}
