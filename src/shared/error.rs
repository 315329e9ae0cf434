use std::fmt;
use thiserror::Error;

#[derive(Debug)]
pub enum AppError {
    Database(String),
    NotFound(String),
    ConfigurationError(String),
    SerializationError(String),
    DeserializationError(String),
    StoreOpen(StoreOpenError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Database(msg) => write!(f, "Database error: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::ConfigurationError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            AppError::DeserializationError(msg) => write!(f, "Deserialization error: {}", msg),
            AppError::StoreOpen(err) => write!(f, "Store open error: {}", err),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::StoreOpen(err) => Some(err),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::SerializationError(err.to_string())
    }
}

impl From<StoreOpenError> for AppError {
    fn from(err: StoreOpenError) -> Self {
        AppError::StoreOpen(err)
    }
}

impl From<String> for AppError {
    fn from(err: String) -> Self {
        AppError::Internal(err)
    }
}

impl From<&str> for AppError {
    fn from(err: &str) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Raised when the local database cannot be opened. Existing data is never
/// touched on this path; recovery is left to the caller.
#[derive(Debug, Error)]
pub enum StoreOpenError {
    #[error("store at {url} is unavailable: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("schema conflict in store at {url}: {reason}")]
    SchemaConflict { url: String, reason: String },

    #[error("store at {url} appears corrupted: {reason}")]
    Corrupted { url: String, reason: String },
}

/// Failure of a single queued operation during a drain.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OperationError {
    #[error("remote service rejected the operation: {0}")]
    Rejected(String),

    #[error("remote service unreachable: {0}")]
    Unreachable(String),

    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid response from remote service: {0}")]
    InvalidResponse(String),

    #[error("local store failure: {0}")]
    Store(String),
}

impl OperationError {
    /// True when the failure means the device could not reach the service at
    /// all, as opposed to the service answering with a rejection.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, OperationError::Unreachable(_))
    }
}

impl From<AppError> for OperationError {
    fn from(err: AppError) -> Self {
        OperationError::Store(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum InterceptError {
    #[error("network request failed: {0}")]
    Network(String),

    #[error("request queued for replay while offline (raw action {action_id})")]
    QueuedOffline { action_id: i64 },

    #[error("failed to precache {url}: {reason}")]
    PrecacheFailed { url: String, reason: String },

    #[error("invalid push payload: {0}")]
    InvalidPushPayload(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Store(#[from] AppError),
}
