//! SQLite-backed key-value store

use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{KeyValueStore, Result, StorageError};

/// Persistent store keeping one JSON document per key.
#[derive(Clone)]
pub struct Storage {
    pool: SqlitePool,
    changes: broadcast::Sender<String>,
}

impl Storage {
    /// Open (and create if needed) the database at `db_path`, or at the
    /// default location under the user's data directory.
    pub async fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(path) => path,
            None => Self::default_path()?,
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        info!("Opening issue store at {}", path.display());

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    /// Private in-memory database. A single connection is kept alive for the
    /// lifetime of the pool so the data survives between queries.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    pub fn default_path() -> Result<PathBuf> {
        directories::ProjectDirs::from("com", "veil", "veil")
            .map(|dirs| dirs.data_dir().join("veil.db"))
            .ok_or_else(|| StorageError::Backend("no home directory for default database path".to_string()))
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self> {
        Self::run_migrations(&pool).await?;
        let (changes, _) = broadcast::channel(64);
        Ok(Self { pool, changes })
    }

    async fn run_migrations(pool: &SqlitePool) -> Result<()> {
        debug!("Running storage migrations");

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for Storage {
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let raw: Option<String> = sqlx::query_scalar("SELECT value FROM kv WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let raw = serde_json::to_string(&value)?;

        sqlx::query(
            r#"
            INSERT INTO kv (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(raw)
        .bind(OffsetDateTime::now_utc().unix_timestamp())
        .execute(&self.pool)
        .await?;

        let _ = self.changes.send(key.to_string());
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<String> {
        self.changes.subscribe()
    }
}
