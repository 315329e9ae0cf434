use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AppEnvironment {
    Development,
    Test,
    #[default]
    Production,
}

impl AppEnvironment {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "test" => Some(Self::Test),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    /// Must be set explicitly before a destructive store reset is allowed,
    /// even in development.
    pub allow_destructive_reset: bool,
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub interceptor: InterceptorConfig,
    pub remote: RemoteConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Retry count at which a still-failing operation is surfaced to the user.
    pub advisory_retry_threshold: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
    /// `None` keeps retrying forever; `Some(n)` dead-letters after `n` failures.
    pub max_attempts: Option<u32>,
    pub use_drain_lease: bool,
    pub lease_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterceptorConfig {
    pub cache_version: String,
    pub api_prefixes: Vec<String>,
    pub precache_urls: Vec<String>,
    pub app_root: String,
    pub legacy_queue_cache_key: String,
    pub notification_icon: Option<String>,
    pub notification_badge: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub request_timeout: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: AppEnvironment::Production,
            allow_destructive_reset: false,
            database: DatabaseConfig {
                url: default_database_url(),
                max_connections: 5,
                connection_timeout: 30,
            },
            sync: SyncConfig::default(),
            interceptor: InterceptorConfig::default(),
            remote: RemoteConfig {
                base_url: "http://localhost:8000".to_string(),
                request_timeout: 15,
            },
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            advisory_retry_threshold: 3,
            base_backoff_ms: 2_000,
            max_backoff_ms: 5 * 60 * 1_000, // 5 minutes
            max_attempts: Some(10),
            use_drain_lease: true,
            lease_ttl_secs: 120,
        }
    }
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            cache_version: "offline-first-v1".to_string(),
            api_prefixes: vec!["/api/".to_string()],
            precache_urls: vec![
                "/".to_string(),
                "/index.html".to_string(),
                "/manifest.json".to_string(),
            ],
            app_root: "/".to_string(),
            legacy_queue_cache_key: "offline-actions".to_string(),
            notification_icon: Some("/icons/icon-192x192.png".to_string()),
            notification_badge: Some("/icons/icon-72x72.png".to_string()),
        }
    }
}

impl SyncConfig {
    pub fn base_backoff(&self) -> Duration {
        Duration::from_millis(self.base_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_ms)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(v) = std::env::var("OFFLINE_FIRST_ENV")
            && let Some(env) = AppEnvironment::parse(&v)
        {
            cfg.environment = env;
        }
        if let Ok(v) = std::env::var("OFFLINE_FIRST_ALLOW_DESTRUCTIVE_RESET") {
            cfg.allow_destructive_reset = parse_bool(&v, cfg.allow_destructive_reset);
        }

        if let Ok(v) = std::env::var("OFFLINE_FIRST_DATABASE_URL")
            && !v.trim().is_empty()
        {
            cfg.database.url = v.trim().to_string();
        }
        if let Ok(v) = std::env::var("OFFLINE_FIRST_DATABASE_MAX_CONNECTIONS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.database.max_connections = value as u32;
        }

        if let Ok(v) = std::env::var("OFFLINE_FIRST_SYNC_ADVISORY_THRESHOLD")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.advisory_retry_threshold = value.max(1) as u32;
        }
        if let Ok(v) = std::env::var("OFFLINE_FIRST_SYNC_BASE_BACKOFF_MS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.base_backoff_ms = value;
        }
        if let Ok(v) = std::env::var("OFFLINE_FIRST_SYNC_MAX_BACKOFF_MS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.sync.max_backoff_ms = value;
        }
        if let Ok(v) = std::env::var("OFFLINE_FIRST_SYNC_MAX_ATTEMPTS") {
            // 0 disables the dead-letter ceiling entirely.
            cfg.sync.max_attempts = match parse_u64(&v) {
                Some(0) => None,
                Some(value) => Some(value as u32),
                None => cfg.sync.max_attempts,
            };
        }
        if let Ok(v) = std::env::var("OFFLINE_FIRST_SYNC_USE_LEASE") {
            cfg.sync.use_drain_lease = parse_bool(&v, cfg.sync.use_drain_lease);
        }

        if let Ok(v) = std::env::var("OFFLINE_FIRST_CACHE_VERSION")
            && !v.trim().is_empty()
        {
            cfg.interceptor.cache_version = v.trim().to_string();
        }
        if let Ok(v) = std::env::var("OFFLINE_FIRST_API_PREFIXES") {
            let prefixes = split_list(&v);
            if !prefixes.is_empty() {
                cfg.interceptor.api_prefixes = prefixes;
            }
        }
        if let Ok(v) = std::env::var("OFFLINE_FIRST_PRECACHE_URLS") {
            cfg.interceptor.precache_urls = split_list(&v);
        }

        if let Ok(v) = std::env::var("OFFLINE_FIRST_REMOTE_BASE_URL")
            && !v.trim().is_empty()
        {
            cfg.remote.base_url = v.trim().trim_end_matches('/').to_string();
        }
        if let Ok(v) = std::env::var("OFFLINE_FIRST_REMOTE_TIMEOUT_SECS")
            && let Some(value) = parse_u64(&v)
        {
            cfg.remote.request_timeout = value.max(1);
        }

        cfg
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.database.url.trim().is_empty() {
            return Err("Database url must not be empty".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }
        if self.sync.advisory_retry_threshold == 0 {
            return Err("Sync advisory_retry_threshold must be greater than 0".to_string());
        }
        if self.sync.max_backoff_ms < self.sync.base_backoff_ms {
            return Err("Sync max_backoff_ms must not be below base_backoff_ms".to_string());
        }
        if let Some(max) = self.sync.max_attempts
            && max == 0
        {
            return Err("Sync max_attempts must be greater than 0 when set".to_string());
        }
        if self.sync.use_drain_lease && self.sync.lease_ttl_secs == 0 {
            return Err("Sync lease_ttl_secs must be greater than 0".to_string());
        }
        if self.interceptor.cache_version.trim().is_empty() {
            return Err("Interceptor cache_version must not be empty".to_string());
        }
        if self
            .interceptor
            .api_prefixes
            .iter()
            .any(|prefix| !prefix.starts_with('/'))
        {
            return Err("Interceptor api_prefixes must start with '/'".to_string());
        }
        if !self.interceptor.app_root.starts_with('/') {
            return Err("Interceptor app_root must start with '/'".to_string());
        }
        Ok(())
    }
}

fn default_database_url() -> String {
    let base = dirs::data_local_dir().unwrap_or_else(|| std::path::PathBuf::from("./data"));
    let path = base.join("offline-first").join("offline.db");
    format!("sqlite://{}?mode=rwc", path.display())
}

fn parse_bool(s: &str, default: bool) -> bool {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

fn parse_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
