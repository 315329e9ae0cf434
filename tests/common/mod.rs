#![allow(dead_code)]

pub mod mocks;

use mocks::{MockEntityHandler, MockNetworkFetcher, MockPresenter, MockSyncNotifier};
use offline_first_lib::application::services::HandlerRegistry;
use offline_first_lib::domain::value_objects::EntityKind;
use offline_first_lib::infrastructure::cache::MemoryCacheStorage;
use offline_first_lib::infrastructure::database::{ConnectionPool, DbPool};
use offline_first_lib::shared::config::AppConfig;
use offline_first_lib::state::{OfflineRuntime, RuntimeDependencies};
use std::sync::Arc;

/// Default config with zero backoff and no dead-letter ceiling, so a failed
/// operation is retried by the very next drain.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_string();
    config.sync.base_backoff_ms = 0;
    config.sync.max_backoff_ms = 0;
    config.sync.max_attempts = None;
    config
}

pub struct TestRuntime {
    pub runtime: OfflineRuntime,
    pub providers: MockEntityHandler,
    pub clients: MockEntityHandler,
    pub network: MockNetworkFetcher,
    pub notifier: Arc<MockSyncNotifier>,
    pub presenter: Arc<MockPresenter>,
    pub cache: MemoryCacheStorage,
}

pub async fn in_memory_pool() -> DbPool {
    ConnectionPool::in_memory()
        .await
        .expect("in-memory store should open")
}

pub async fn runtime(platform_online: Option<bool>) -> TestRuntime {
    runtime_with(test_config(), in_memory_pool().await, platform_online).await
}

pub async fn runtime_with(
    config: AppConfig,
    pool: DbPool,
    platform_online: Option<bool>,
) -> TestRuntime {
    let providers = MockEntityHandler::new(EntityKind::Provider);
    let clients = MockEntityHandler::new(EntityKind::Client);
    let handlers = HandlerRegistry::new()
        .with(Arc::new(providers.clone()))
        .with(Arc::new(clients.clone()));

    let network = MockNetworkFetcher::new();
    let notifier = Arc::new(MockSyncNotifier::default());
    let presenter = Arc::new(MockPresenter::default());
    let cache = MemoryCacheStorage::new();

    let runtime = OfflineRuntime::with_pool(
        config,
        pool,
        RuntimeDependencies {
            handlers,
            fetcher: Arc::new(network.clone()),
            presenter: presenter.clone(),
            notifier: notifier.clone(),
            cache: Arc::new(cache.clone()),
            platform_online,
        },
    )
    .await
    .expect("runtime should assemble");

    TestRuntime {
        runtime,
        providers,
        clients,
        network,
        notifier,
        presenter,
        cache,
    }
}
