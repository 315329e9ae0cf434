use super::NetworkInterceptor;
use crate::application::ports::OfflineQueue;
use crate::domain::entities::{
    InterceptedRequest, LegacyQueuedRequest, RawAction, RawActionDraft, ReplayReport,
    RequestMode,
};
use crate::shared::error::InterceptError;
use chrono::Utc;
use tracing::{debug, info, warn};

impl NetworkInterceptor {
    /// Replays due raw actions in order. Successes are removed; failures stay
    /// queued for the next trigger.
    pub async fn replay_queued_actions(&self) -> Result<ReplayReport, InterceptError> {
        let now = Utc::now();
        let queued = self.raw_queue.snapshot().await?;
        let mut report = ReplayReport::default();

        for action in queued {
            if !action.retry_state.is_ready(now) {
                report.skipped += 1;
                continue;
            }

            let request = request_for(&action);
            let failure = match self.fetcher.fetch(&request).await {
                Ok(response) if response.is_success() => None,
                Ok(response) => Some(format!("HTTP {}", response.status)),
                Err(err) => Some(err.to_string()),
            };

            match failure {
                None => {
                    self.raw_queue.ack(action.id).await?;
                    report.replayed += 1;
                    debug!(target: "offline::interceptor", id = action.id.value(), "raw action replayed");
                }
                Some(error) => {
                    let outcome = self.raw_queue.fail(&action, &error, Utc::now()).await?;
                    report.failed += 1;
                    warn!(
                        target: "offline::interceptor",
                        id = action.id.value(),
                        retries = outcome.retries,
                        state = outcome.retry_state.label(),
                        error = %error,
                        "raw action replay failed"
                    );
                }
            }
        }

        info!(
            target: "offline::interceptor",
            replayed = report.replayed,
            failed = report.failed,
            skipped = report.skipped,
            "background replay finished"
        );
        Ok(report)
    }

    /// Imports every legacy JSON queue found under the reserved cache key and
    /// deletes the entry. A malformed array is left in place.
    pub async fn import_legacy_queue(&self) -> Result<usize, InterceptError> {
        let key = self.config.legacy_queue_cache_key.clone();
        let mut imported = 0;

        for cache_name in self.cache.cache_names().await? {
            let Some(entry) = self.cache.lookup(&cache_name, &key).await? else {
                continue;
            };
            let legacy: Vec<LegacyQueuedRequest> = match serde_json::from_slice(&entry.body) {
                Ok(legacy) => legacy,
                Err(err) => {
                    warn!(
                        target: "offline::interceptor",
                        cache = %cache_name,
                        error = %err,
                        "legacy queue is not a valid action list, leaving it untouched"
                    );
                    continue;
                }
            };

            let found = legacy.len();
            let drafts = legacy.into_iter().map(RawActionDraft::from).collect();
            let inserted = self.raw_queue.enqueue_batch(drafts).await?.len();
            if inserted < found {
                debug!(
                    target: "offline::interceptor",
                    cache = %cache_name,
                    skipped = found - inserted,
                    "legacy actions already queued"
                );
            }
            imported += inserted;
            self.cache.delete(&cache_name, &key).await?;
        }

        if imported > 0 {
            info!(target: "offline::interceptor", imported, "legacy queue imported");
        }
        Ok(imported)
    }
}

fn request_for(action: &RawAction) -> InterceptedRequest {
    InterceptedRequest {
        url: action.url.clone(),
        method: action.method.clone(),
        headers: action.headers.clone(),
        body: action.body.clone(),
        mode: RequestMode::Other,
    }
}
