use async_trait::async_trait;
use chrono::Utc;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{debug, info};

use super::{decode_state, encode_state, StateStore};
use crate::config::StoreConfig;
use crate::error::{StorageError, StorageResult};
use crate::memory::MemoryState;

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed store keeping the state document in a single row
#[derive(Clone)]
pub struct SqliteStateStore {
    pool: SqlitePool,
    location: String,
}

impl SqliteStateStore {
    /// Create a new SQLite store instance
    pub async fn new(config: &StoreConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self {
            pool,
            location: config.path.display().to_string(),
        };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create a store over a private in-memory database
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        // A single long-lived connection: every new in-memory connection is a new database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to open in-memory database: {}", e),
            })?;

        let store = Self {
            pool,
            location: "sqlite::memory:".to_string(),
        };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl StateStore for SqliteStateStore {
    async fn load(&self) -> StorageResult<Option<MemoryState>> {
        let document: Option<String> =
            sqlx::query_scalar("SELECT document FROM memory_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        document
            .map(|doc| decode_state(doc.as_bytes(), &self.location))
            .transpose()
    }

    async fn save(&self, state: &MemoryState) -> StorageResult<()> {
        let bytes = encode_state(state)?;
        let document = String::from_utf8(bytes).map_err(|e| StorageError::Serialization {
            message: e.to_string(),
        })?;

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            INSERT INTO memory_state (id, document, updated_at)
            VALUES (1, ?, ?)
            ON CONFLICT(id) DO UPDATE
            SET document = excluded.document, updated_at = excluded.updated_at
            "#,
        )
        .bind(&document)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        debug!(location = %self.location, bytes = document.len(), "Saved memory state");
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        sqlx::query("DELETE FROM memory_state")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}
