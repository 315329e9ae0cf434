use crate::domain::entities::NetworkResponse;
use crate::shared::error::AppError;
use async_trait::async_trait;

/// Named response caches keyed by request.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    async fn put(
        &self,
        cache_name: &str,
        key: &str,
        response: NetworkResponse,
    ) -> Result<(), AppError>;

    async fn put_all(
        &self,
        cache_name: &str,
        entries: Vec<(String, NetworkResponse)>,
    ) -> Result<(), AppError>;

    async fn lookup(
        &self,
        cache_name: &str,
        key: &str,
    ) -> Result<Option<NetworkResponse>, AppError>;

    async fn delete(&self, cache_name: &str, key: &str) -> Result<bool, AppError>;

    async fn cache_names(&self) -> Result<Vec<String>, AppError>;

    async fn delete_cache(&self, cache_name: &str) -> Result<bool, AppError>;
}
