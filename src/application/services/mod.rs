pub mod connectivity_monitor;
pub mod mutation_service;
pub mod network_interceptor;
pub mod offline_queues;
pub mod retry_policy;
pub mod sync_engine;

pub use connectivity_monitor::{ConnectivityMonitor, ConnectivitySnapshot};
pub use mutation_service::{MutationOutcome, MutationService};
pub use network_interceptor::{ActivationReport, NetworkInterceptor, RequestCategory, WorkerPhase};
pub use offline_queues::{PendingOperationQueue, RawActionQueue};
pub use retry_policy::RetryPolicy;
pub use sync_engine::{
    DrainOutcome, HandlerRegistry, SyncEngine, SyncEngineSettings, SyncStatusEvent,
    SyncSubscription,
};
