//! Sits between the client and the network: per-category caching,
//! queueing of failed writes, and push delivery.

mod background_replay;
mod lifecycle;
mod push;
mod strategy;

pub use lifecycle::{ActivationReport, WorkerPhase};
pub use strategy::{RequestCategory, classify};

use super::offline_queues::RawActionQueue;
use crate::application::ports::{CacheStorage, NetworkFetcher, NotificationPresenter, OfflineQueue};
use crate::domain::entities::{InterceptedRequest, NetworkResponse, RawActionDraft};
use crate::shared::config::InterceptorConfig;
use crate::shared::error::InterceptError;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub struct NetworkInterceptor {
    config: InterceptorConfig,
    cache: Arc<dyn CacheStorage>,
    fetcher: Arc<dyn NetworkFetcher>,
    raw_queue: RawActionQueue,
    presenter: Arc<dyn NotificationPresenter>,
    phase: RwLock<WorkerPhase>,
    clients_claimed: AtomicBool,
}

impl NetworkInterceptor {
    pub fn new(
        config: InterceptorConfig,
        cache: Arc<dyn CacheStorage>,
        fetcher: Arc<dyn NetworkFetcher>,
        raw_queue: RawActionQueue,
        presenter: Arc<dyn NotificationPresenter>,
    ) -> Self {
        Self {
            config,
            cache,
            fetcher,
            raw_queue,
            presenter,
            phase: RwLock::new(WorkerPhase::Parsed),
            clients_claimed: AtomicBool::new(false),
        }
    }

    pub fn cache_name(&self) -> &str {
        &self.config.cache_version
    }

    pub fn raw_queue(&self) -> &RawActionQueue {
        &self.raw_queue
    }

    pub async fn handle_fetch(
        &self,
        request: &InterceptedRequest,
    ) -> Result<NetworkResponse, InterceptError> {
        if *self.phase.read().await != WorkerPhase::Activated {
            return self.fetcher.fetch(request).await;
        }

        match classify(request, &self.config.api_prefixes) {
            RequestCategory::Api => self.network_first_api(request).await,
            RequestCategory::Navigation => self.network_first_navigation(request).await,
            RequestCategory::Static => self.cache_first(request).await,
        }
    }

    async fn network_first_api(
        &self,
        request: &InterceptedRequest,
    ) -> Result<NetworkResponse, InterceptError> {
        let key = request.cache_key();
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if request.is_get() && response.is_success() {
                    self.store_in_cache(&key, &response).await;
                }
                Ok(response)
            }
            Err(err) => {
                if let Some(cached) = self.cache.lookup(self.cache_name(), &key).await? {
                    debug!(target: "offline::interceptor", url = %request.url, "serving cached API response");
                    return Ok(cached);
                }
                if request.is_write() {
                    let action = self
                        .raw_queue
                        .enqueue(RawActionDraft {
                            url: request.url.clone(),
                            method: request.method.clone(),
                            headers: request.headers.clone(),
                            body: request.body.clone(),
                            timestamp: None,
                        })
                        .await?;
                    info!(
                        target: "offline::interceptor",
                        id = action.id.value(),
                        method = %action.method,
                        url = %action.url,
                        "write queued for background replay"
                    );
                    return Err(InterceptError::QueuedOffline {
                        action_id: action.id.value(),
                    });
                }
                Err(err)
            }
        }
    }

    async fn network_first_navigation(
        &self,
        request: &InterceptedRequest,
    ) -> Result<NetworkResponse, InterceptError> {
        let key = request.cache_key();
        match self.fetcher.fetch(request).await {
            Ok(response) => {
                if response.is_success() {
                    self.store_in_cache(&key, &response).await;
                }
                Ok(response)
            }
            Err(err) => {
                if let Some(cached) = self.cache.lookup(self.cache_name(), &key).await? {
                    return Ok(cached);
                }
                let shell_key = InterceptedRequest::get(self.config.app_root.clone()).cache_key();
                if let Some(shell) = self.cache.lookup(self.cache_name(), &shell_key).await? {
                    debug!(target: "offline::interceptor", url = %request.url, "serving app shell offline");
                    return Ok(shell);
                }
                Err(err)
            }
        }
    }

    async fn cache_first(
        &self,
        request: &InterceptedRequest,
    ) -> Result<NetworkResponse, InterceptError> {
        let key = request.cache_key();
        if let Some(cached) = self.cache.lookup(self.cache_name(), &key).await? {
            return Ok(cached);
        }
        let response = self.fetcher.fetch(request).await?;
        if request.is_get() && response.is_success() {
            self.store_in_cache(&key, &response).await;
        }
        Ok(response)
    }

    /// Cache writes are best effort; the response is served either way.
    async fn store_in_cache(&self, key: &str, response: &NetworkResponse) {
        if let Err(err) = self
            .cache
            .put(self.cache_name(), key, response.clone())
            .await
        {
            warn!(target: "offline::interceptor", key, error = %err, "failed to cache response");
        }
    }
}
