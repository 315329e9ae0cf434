use crate::application::ports::CacheStorage;
use crate::domain::entities::NetworkResponse;
use crate::shared::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Clone)]
struct CacheEntry {
    response: NetworkResponse,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

type NamedCaches = HashMap<String, HashMap<String, CacheEntry>>;

/// In-process response caches. Entries never expire unless a TTL is set.
#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    caches: Arc<RwLock<NamedCaches>>,
    default_ttl: Option<Duration>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(default_ttl_seconds: u64) -> Self {
        Self {
            caches: Arc::new(RwLock::new(HashMap::new())),
            default_ttl: Some(Duration::from_secs(default_ttl_seconds)),
        }
    }

    fn entry(&self, response: NetworkResponse) -> CacheEntry {
        CacheEntry {
            response,
            expires_at: self.default_ttl.map(|ttl| Instant::now() + ttl),
        }
    }

    /// Drops expired entries across every cache.
    pub async fn cleanup_expired(&self) {
        let now = Instant::now();
        let mut caches = self.caches.write().await;
        for entries in caches.values_mut() {
            entries.retain(|_, entry| entry.is_live(now));
        }
    }

    pub async fn size(&self, cache_name: &str) -> usize {
        self.caches
            .read()
            .await
            .get(cache_name)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn put(
        &self,
        cache_name: &str,
        key: &str,
        response: NetworkResponse,
    ) -> Result<(), AppError> {
        let entry = self.entry(response);
        let mut caches = self.caches.write().await;
        caches
            .entry(cache_name.to_string())
            .or_default()
            .insert(key.to_string(), entry);
        Ok(())
    }

    async fn put_all(
        &self,
        cache_name: &str,
        entries: Vec<(String, NetworkResponse)>,
    ) -> Result<(), AppError> {
        let prepared: Vec<(String, CacheEntry)> = entries
            .into_iter()
            .map(|(key, response)| (key, self.entry(response)))
            .collect();
        let mut caches = self.caches.write().await;
        caches
            .entry(cache_name.to_string())
            .or_default()
            .extend(prepared);
        Ok(())
    }

    async fn lookup(
        &self,
        cache_name: &str,
        key: &str,
    ) -> Result<Option<NetworkResponse>, AppError> {
        let caches = self.caches.read().await;
        let now = Instant::now();
        Ok(caches
            .get(cache_name)
            .and_then(|entries| entries.get(key))
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.response.clone()))
    }

    async fn delete(&self, cache_name: &str, key: &str) -> Result<bool, AppError> {
        let mut caches = self.caches.write().await;
        Ok(caches
            .get_mut(cache_name)
            .and_then(|entries| entries.remove(key))
            .is_some())
    }

    async fn cache_names(&self) -> Result<Vec<String>, AppError> {
        let mut names: Vec<String> = self.caches.read().await.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    async fn delete_cache(&self, cache_name: &str) -> Result<bool, AppError> {
        Ok(self.caches.write().await.remove(cache_name).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn caches_are_isolated_by_name() {
        let storage = MemoryCacheStorage::new();
        storage
            .put("v1", "GET /", NetworkResponse::ok("old shell"))
            .await
            .unwrap();
        storage
            .put("v2", "GET /", NetworkResponse::ok("new shell"))
            .await
            .unwrap();

        assert_eq!(
            storage.lookup("v2", "GET /").await.unwrap().unwrap().body,
            b"new shell".to_vec()
        );
        assert!(storage.delete_cache("v1").await.unwrap());
        assert_eq!(storage.cache_names().await.unwrap(), vec!["v2".to_string()]);
        assert!(storage.lookup("v1", "GET /").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn expired_entries_are_not_served() {
        let storage = MemoryCacheStorage::with_ttl(0);
        storage
            .put("v1", "GET /a", NetworkResponse::ok("a"))
            .await
            .unwrap();
        assert!(storage.lookup("v1", "GET /a").await.unwrap().is_none());
        storage.cleanup_expired().await;
        assert_eq!(storage.size("v1").await, 0);
    }

    #[tokio::test]
    async fn delete_reports_presence() {
        let storage = MemoryCacheStorage::new();
        storage
            .put_all(
                "v1",
                vec![
                    ("GET /a".to_string(), NetworkResponse::ok("a")),
                    ("GET /b".to_string(), NetworkResponse::ok("b")),
                ],
            )
            .await
            .unwrap();
        assert_eq!(storage.size("v1").await, 2);
        assert!(storage.delete("v1", "GET /a").await.unwrap());
        assert!(!storage.delete("v1", "GET /a").await.unwrap());
        assert!(!storage.delete("missing", "GET /a").await.unwrap());
    }
}
