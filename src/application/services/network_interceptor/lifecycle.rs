use super::NetworkInterceptor;
use crate::domain::entities::InterceptedRequest;
use crate::shared::error::InterceptError;
use futures::future::try_join_all;
use serde::Serialize;
use std::sync::atomic::Ordering;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPhase {
    /// Created; requests go straight to the network.
    Parsed,
    /// Shell precached. Waiting is skipped, so activation may follow at once.
    Installed,
    Activated,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivationReport {
    pub deleted_caches: Vec<String>,
    pub imported_actions: usize,
}

impl NetworkInterceptor {
    pub async fn phase(&self) -> WorkerPhase {
        *self.phase.read().await
    }

    pub fn controls_clients(&self) -> bool {
        self.clients_claimed.load(Ordering::Acquire)
    }

    /// Precaches the shell routes. Either every route is cached or none is.
    pub async fn install(&self) -> Result<(), InterceptError> {
        let fetches = self.config.precache_urls.iter().map(|url| async move {
            let request = InterceptedRequest::get(url.clone());
            let response =
                self.fetcher
                    .fetch(&request)
                    .await
                    .map_err(|err| InterceptError::PrecacheFailed {
                        url: url.clone(),
                        reason: err.to_string(),
                    })?;
            if !response.is_success() {
                return Err(InterceptError::PrecacheFailed {
                    url: url.clone(),
                    reason: format!("HTTP {}", response.status),
                });
            }
            Ok::<_, InterceptError>((request.cache_key(), response))
        });
        let entries = try_join_all(fetches).await?;

        let cached = entries.len();
        self.cache.put_all(self.cache_name(), entries).await?;
        *self.phase.write().await = WorkerPhase::Installed;
        info!(
            target: "offline::interceptor",
            cache = self.cache_name(),
            cached,
            "install complete"
        );
        Ok(())
    }

    /// Moves any legacy queue into the durable store, drops every cache of
    /// another version and takes control of clients.
    pub async fn activate(&self) -> Result<ActivationReport, InterceptError> {
        if self.phase().await == WorkerPhase::Parsed {
            return Err(InterceptError::InvalidRequest(
                "activate called before install".to_string(),
            ));
        }

        let imported_actions = self.import_legacy_queue().await?;

        let mut deleted_caches = Vec::new();
        for name in self.cache.cache_names().await? {
            if name != self.cache_name() && self.cache.delete_cache(&name).await? {
                deleted_caches.push(name);
            }
        }

        *self.phase.write().await = WorkerPhase::Activated;
        self.clients_claimed.store(true, Ordering::Release);
        info!(
            target: "offline::interceptor",
            cache = self.cache_name(),
            deleted = deleted_caches.len(),
            imported = imported_actions,
            "activated"
        );
        Ok(ActivationReport {
            deleted_caches,
            imported_actions,
        })
    }
}
