use crate::application::ports::{
    CacheStorage, DurableStore, NetworkFetcher, NotificationPresenter, SyncNotifier,
};
use crate::application::services::{
    ConnectivityMonitor, HandlerRegistry, MutationService, NetworkInterceptor, RawActionQueue,
    RetryPolicy, SyncEngine, SyncEngineSettings,
};
use crate::infrastructure::cache::MemoryCacheStorage;
use crate::infrastructure::database::{ConnectionPool, DbPool, SqliteDurableStore};
use crate::infrastructure::notifications::TracingSyncNotifier;
use crate::shared::config::AppConfig;
use crate::shared::error::AppError;
use std::sync::Arc;
use tracing::info;

/// Collaborators supplied by the host application.
pub struct RuntimeDependencies {
    pub handlers: HandlerRegistry,
    pub fetcher: Arc<dyn NetworkFetcher>,
    pub presenter: Arc<dyn NotificationPresenter>,
    pub notifier: Arc<dyn SyncNotifier>,
    pub cache: Arc<dyn CacheStorage>,
    /// Current platform signal, if the host knows it at start-up.
    pub platform_online: Option<bool>,
}

impl RuntimeDependencies {
    pub fn new(
        handlers: HandlerRegistry,
        fetcher: Arc<dyn NetworkFetcher>,
        presenter: Arc<dyn NotificationPresenter>,
    ) -> Self {
        Self {
            handlers,
            fetcher,
            presenter,
            notifier: Arc::new(TracingSyncNotifier),
            cache: Arc::new(MemoryCacheStorage::new()),
            platform_online: None,
        }
    }
}

/// Every component of the offline layer, wired over one store.
pub struct OfflineRuntime {
    pub config: AppConfig,
    pub pool: DbPool,
    pub store: Arc<SqliteDurableStore>,
    pub engine: Arc<SyncEngine>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub mutations: Arc<MutationService>,
    pub interceptor: Arc<NetworkInterceptor>,
}

impl OfflineRuntime {
    pub async fn initialize(
        config: AppConfig,
        handlers: HandlerRegistry,
        fetcher: Arc<dyn NetworkFetcher>,
        presenter: Arc<dyn NotificationPresenter>,
    ) -> Result<Self, AppError> {
        config.validate().map_err(AppError::ConfigurationError)?;
        let pool = ConnectionPool::open(&config.database).await?;
        Self::with_pool(
            config,
            pool,
            RuntimeDependencies::new(handlers, fetcher, presenter),
        )
        .await
    }

    pub async fn with_pool(
        config: AppConfig,
        pool: DbPool,
        deps: RuntimeDependencies,
    ) -> Result<Self, AppError> {
        let store = Arc::new(SqliteDurableStore::new(pool.clone()));
        let shared_store: Arc<dyn DurableStore> = store.clone();

        let engine = Arc::new(SyncEngine::new(
            Arc::clone(&shared_store),
            deps.handlers,
            deps.notifier,
            SyncEngineSettings::from_config(&config.sync),
        ));
        let monitor = ConnectivityMonitor::start(
            Arc::clone(&shared_store),
            Arc::clone(&engine),
            deps.platform_online,
        )
        .await?;
        let mutations = Arc::new(MutationService::new(
            Arc::clone(&shared_store),
            Arc::clone(&engine),
            Arc::clone(&monitor),
        ));
        let raw_queue = RawActionQueue::new(
            Arc::clone(&shared_store),
            RetryPolicy::from_config(&config.sync),
        );
        let interceptor = Arc::new(NetworkInterceptor::new(
            config.interceptor.clone(),
            deps.cache,
            deps.fetcher,
            raw_queue,
            deps.presenter,
        ));

        info!(
            target: "offline::store",
            environment = ?config.environment,
            "offline runtime initialized"
        );
        Ok(Self {
            config,
            pool,
            store,
            engine,
            monitor,
            mutations,
            interceptor,
        })
    }

    pub async fn shutdown(&self) {
        self.monitor.shutdown();
        self.pool.close().await;
        info!(target: "offline::store", "offline runtime shut down");
    }
}
