//! Offline-first client data layer: a durable mutation queue, a sync engine
//! that replays it against the remote service, and a network interceptor
//! that serves cached responses while offline.

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod shared;
pub mod state;

pub use application::services::{
    ConnectivityMonitor, DrainOutcome, HandlerRegistry, MutationOutcome, MutationService,
    NetworkInterceptor, SyncEngine,
};
pub use shared::{AppConfig, AppError};
pub use state::{OfflineRuntime, RuntimeDependencies};

/// Installs the crate's default tracing subscriber.
pub fn init_logging(json: bool) {
    shared::logging::init(env!("CARGO_PKG_NAME"), json);
}
