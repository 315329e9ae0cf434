use anyhow::{Context, Result, bail};
use chrono::{Duration, Utc};
use clap::{Parser, Subcommand};
use offline_first_lib::application::ports::DurableStore;
use offline_first_lib::application::services::{
    PendingOperationQueue, RawActionQueue, RetryPolicy,
};
use offline_first_lib::domain::value_objects::{PendingOperationId, RawActionId};
use offline_first_lib::infrastructure::database::{
    ConnectionPool, DeveloperReset, SqliteDurableStore,
};
use offline_first_lib::shared::AppConfig;
use offline_first_lib::shared::logging;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "offline-queue-inspect")]
#[command(about = "Inspect and repair the local offline queue", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// SQLite URL of the local store (defaults to the platform data dir)
    #[arg(short, long, env = "OFFLINE_FIRST_DATABASE_URL")]
    database_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn", env = "LOG_LEVEL")]
    log_level: String,

    /// Enable JSON logging
    #[arg(long, env = "JSON_LOGS")]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print pending operations, raw actions and sync metadata as JSON
    Show,
    /// Reset an entry's retry state so the next drain picks it up
    Requeue {
        id: i64,
        /// Target the raw action queue instead of pending operations
        #[arg(long)]
        raw: bool,
    },
    /// Remove an entry without replaying it
    Discard {
        id: i64,
        #[arg(long)]
        raw: bool,
    },
    /// Drop soft-deleted mirrors older than the given number of days
    Purge {
        #[arg(long, default_value_t = 30)]
        older_than_days: i64,
    },
    /// Wipe every table (development only)
    Reset,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_with_filter("offline-queue-inspect", &cli.log_level, cli.json_logs);

    let mut config = AppConfig::from_env();
    if let Some(url) = cli.database_url {
        config.database.url = url;
    }
    config.validate().map_err(anyhow::Error::msg)?;

    let pool = ConnectionPool::open(&config.database)
        .await
        .with_context(|| format!("failed to open {}", config.database.url))?;
    let store = Arc::new(SqliteDurableStore::new(pool));
    let shared: Arc<dyn DurableStore> = store.clone();
    let policy = RetryPolicy::from_config(&config.sync);

    match cli.command {
        Commands::Show => {
            let report = json!({
                "pendingOperations": store.list_pending_operations().await?,
                "rawActions": store.list_raw_actions().await?,
                "syncMetadata": store.list_sync_metadata().await?,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Requeue { id, raw } => {
            if raw {
                RawActionQueue::new(shared, policy)
                    .requeue(RawActionId::new(id).map_err(anyhow::Error::msg)?)
                    .await?;
            } else {
                PendingOperationQueue::new(shared, policy)
                    .requeue(PendingOperationId::new(id).map_err(anyhow::Error::msg)?)
                    .await?;
            }
            info!(id, raw, "entry requeued");
            println!("requeued {id}");
        }
        Commands::Discard { id, raw } => {
            let removed = if raw {
                RawActionQueue::new(shared, policy)
                    .discard(RawActionId::new(id).map_err(anyhow::Error::msg)?)
                    .await?
            } else {
                PendingOperationQueue::new(shared, policy)
                    .discard(PendingOperationId::new(id).map_err(anyhow::Error::msg)?)
                    .await?
            };
            if !removed {
                bail!("no entry with id {id}");
            }
            println!("discarded {id}");
        }
        Commands::Purge { older_than_days } => {
            let before = Utc::now() - Duration::days(older_than_days.max(0));
            let purged = store.purge_deleted_mirrors(before).await?;
            println!("purged {purged} mirrors");
        }
        Commands::Reset => {
            let token = DeveloperReset::authorize(&config)?;
            store.reset_destructively(token).await?;
            println!("local store reset");
        }
    }

    store.pool().close().await;
    Ok(())
}
