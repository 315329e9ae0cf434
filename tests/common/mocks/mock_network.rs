use async_trait::async_trait;
use offline_first_lib::application::ports::NetworkFetcher;
use offline_first_lib::domain::entities::{InterceptedRequest, NetworkResponse};
use offline_first_lib::shared::error::InterceptError;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct MockNetworkFetcher {
    is_connected: Arc<RwLock<bool>>,
    routes: Arc<RwLock<HashMap<String, NetworkResponse>>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockNetworkFetcher {
    pub fn new() -> Self {
        Self {
            is_connected: Arc::new(RwLock::new(true)),
            routes: Arc::new(RwLock::new(HashMap::new())),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn set_connected(&self, connected: bool) {
        *self.is_connected.write().await = connected;
    }

    pub async fn route(&self, url: &str, response: NetworkResponse) {
        self.routes.write().await.insert(url.to_string(), response);
    }

    pub async fn requests(&self) -> Vec<String> {
        self.requests.read().await.clone()
    }
}

#[async_trait]
impl NetworkFetcher for MockNetworkFetcher {
    async fn fetch(&self, request: &InterceptedRequest) -> Result<NetworkResponse, InterceptError> {
        self.requests.write().await.push(request.cache_key());
        if !*self.is_connected.read().await {
            return Err(InterceptError::Network("network unreachable".to_string()));
        }
        Ok(self
            .routes
            .read()
            .await
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| NetworkResponse::new(404, Vec::new())))
    }
}
