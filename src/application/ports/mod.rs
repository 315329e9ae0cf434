pub mod cache_storage;
pub mod durable_store;
pub mod network;
pub mod notifier;
pub mod offline_queue;
pub mod remote_service;

pub use cache_storage::CacheStorage;
pub use durable_store::DurableStore;
pub use network::NetworkFetcher;
pub use notifier::{NotificationPresenter, SyncNotifier};
pub use offline_queue::{FailureOutcome, OfflineQueue};
pub use remote_service::EntityHandler;
