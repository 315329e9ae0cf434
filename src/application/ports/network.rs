use crate::domain::entities::{InterceptedRequest, NetworkResponse};
use crate::shared::error::InterceptError;
use async_trait::async_trait;

/// Raw network access. Non-success statuses are responses, not errors; an
/// `Err` means the request never completed.
#[async_trait]
pub trait NetworkFetcher: Send + Sync {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<NetworkResponse, InterceptError>;
}
