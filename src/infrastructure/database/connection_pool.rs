use crate::shared::config::DatabaseConfig;
use crate::shared::error::StoreOpenError;
use sqlx::migrate::MigrateError;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

pub type DbPool = Pool<Sqlite>;

/// Opens the local store and brings its schema up to the latest version.
/// Every failure is reported as a [`StoreOpenError`]; nothing is deleted.
pub struct ConnectionPool;

impl ConnectionPool {
    pub async fn open(config: &DatabaseConfig) -> Result<DbPool, StoreOpenError> {
        let url = config.url.as_str();
        ensure_parent_dir(url)?;

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect(url)
            .await
            .map_err(|err| classify_sqlx_error(url, &err))?;

        info!(target: "offline::store", url, "database connected");

        if let Err(err) = Self::prepare(&pool, url).await {
            pool.close().await;
            return Err(err);
        }
        Ok(pool)
    }

    /// Private in-memory database with the full schema. Holds a single
    /// connection for its whole lifetime so the data is not dropped.
    pub async fn in_memory() -> Result<DbPool, StoreOpenError> {
        let url = "sqlite::memory:";
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect(url)
            .await
            .map_err(|err| classify_sqlx_error(url, &err))?;
        Self::prepare(&pool, url).await?;
        Ok(pool)
    }

    async fn prepare(pool: &DbPool, url: &str) -> Result<(), StoreOpenError> {
        let check: (String,) = sqlx::query_as("PRAGMA quick_check")
            .fetch_one(pool)
            .await
            .map_err(|err| classify_sqlx_error(url, &err))?;
        if check.0 != "ok" {
            return Err(StoreOpenError::Corrupted {
                url: url.to_string(),
                reason: check.0,
            });
        }

        info!(target: "offline::store", "running database migrations");
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|err| classify_migrate_error(url, err))?;
        info!(target: "offline::store", "database migrations completed");
        Ok(())
    }
}

fn ensure_parent_dir(url: &str) -> Result<(), StoreOpenError> {
    let Some(path) = file_path_from_url(url) else {
        return Ok(());
    };
    if let Some(parent) = Path::new(&path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|err| StoreOpenError::Unavailable {
            url: url.to_string(),
            reason: err.to_string(),
        })?;
    }
    Ok(())
}

/// `sqlite://path/to/db?mode=rwc` -> `path/to/db`. `None` for in-memory URLs.
fn file_path_from_url(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))
        .unwrap_or(url);
    let path = rest.split('?').next().unwrap_or_default();
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(path.to_string())
}

fn looks_corrupted(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("not a database")
        || lower.contains("malformed")
        || lower.contains("corrupt")
}

fn classify_sqlx_error(url: &str, err: &sqlx::Error) -> StoreOpenError {
    let reason = err.to_string();
    match err {
        sqlx::Error::Database(db)
            if matches!(db.code().as_deref(), Some("11") | Some("26"))
                || looks_corrupted(db.message()) =>
        {
            StoreOpenError::Corrupted {
                url: url.to_string(),
                reason,
            }
        }
        _ if looks_corrupted(&reason) => StoreOpenError::Corrupted {
            url: url.to_string(),
            reason,
        },
        _ => StoreOpenError::Unavailable {
            url: url.to_string(),
            reason,
        },
    }
}

fn classify_migrate_error(url: &str, err: MigrateError) -> StoreOpenError {
    match err {
        MigrateError::Execute(inner) => match classify_sqlx_error(url, &inner) {
            StoreOpenError::Unavailable { reason, .. } => StoreOpenError::SchemaConflict {
                url: url.to_string(),
                reason,
            },
            other => other,
        },
        MigrateError::VersionMissing(version)
        | MigrateError::VersionMismatch(version)
        | MigrateError::Dirty(version) => {
            warn!(target: "offline::store", version, "schema history does not match this build");
            StoreOpenError::SchemaConflict {
                url: url.to_string(),
                reason: err.to_string(),
            }
        }
        other => StoreOpenError::Unavailable {
            url: url.to_string(),
            reason: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_config(dir: &TempDir, name: &str) -> DatabaseConfig {
        let path = dir.path().join(name);
        DatabaseConfig {
            url: format!("sqlite://{}?mode=rwc", path.display()),
            max_connections: 2,
            connection_timeout: 5,
        }
    }

    #[test]
    fn file_path_extraction() {
        assert_eq!(
            file_path_from_url("sqlite:///tmp/a/b.db?mode=rwc").as_deref(),
            Some("/tmp/a/b.db")
        );
        assert_eq!(file_path_from_url("sqlite::memory:"), None);
    }

    #[tokio::test]
    async fn open_creates_database_and_schema() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir, "nested/offline.db");
        let pool = ConnectionPool::open(&config).await.unwrap();

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        let names: Vec<String> = tables.into_iter().map(|t| t.0).collect();
        for expected in [
            "connectivity_flags",
            "drain_leases",
            "entity_mirrors",
            "pending_operations",
            "raw_actions",
            "sync_metadata",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }
        pool.close().await;
        assert!(dir.path().join("nested/offline.db").exists());
    }

    #[tokio::test]
    async fn garbage_file_is_reported_corrupted_and_left_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.db");
        let garbage = vec![0x42u8; 8192];
        std::fs::write(&path, &garbage).unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", path.display()),
            max_connections: 1,
            connection_timeout: 5,
        };

        let err = ConnectionPool::open(&config).await.unwrap_err();
        assert!(matches!(err, StoreOpenError::Corrupted { .. }), "{err:?}");
        assert_eq!(std::fs::read(&path).unwrap(), garbage);
    }

    #[tokio::test]
    async fn unknown_applied_migration_is_a_schema_conflict() {
        let dir = TempDir::new().unwrap();
        let config = file_config(&dir, "future.db");
        let pool = ConnectionPool::open(&config).await.unwrap();
        sqlx::query(
            "INSERT INTO _sqlx_migrations (version, description, success, checksum, execution_time) \
             VALUES (99990101000000, 'from a newer build', 1, x'00', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool.close().await;

        let err = ConnectionPool::open(&config).await.unwrap_err();
        assert!(matches!(err, StoreOpenError::SchemaConflict { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn missing_directory_without_create_mode_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let config = DatabaseConfig {
            url: format!("sqlite://{}", dir.path().join("absent.db").display()),
            max_connections: 1,
            connection_timeout: 5,
        };
        let err = ConnectionPool::open(&config).await.unwrap_err();
        assert!(matches!(err, StoreOpenError::Unavailable { .. }), "{err:?}");
    }
}
