//! SQLite pool for the account store
//!
//! File databases run in WAL mode with a busy timeout so the daemon and an
//! operator's ad-hoc queries can share the file. The `accounts` schema is
//! applied on every open; the DDL is written with `IF NOT EXISTS`.

use std::{path::Path, time::Duration};

use crmsync_core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::CacheError;

/// Embedded schema for the `accounts` table
const ACCOUNTS_SCHEMA: &str = include_str!("migrations/20261018_accounts.sql");

/// How long a writer waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Connection cap for file databases
const MAX_FILE_CONNECTIONS: u32 = 5;

/// Shared handle on the account database
#[derive(Debug, Clone)]
pub struct DatabasePool {
    pool: SqlitePool,
}

impl DatabasePool {
    /// Opens the database named by the `database` config section
    pub async fn open(config: &DatabaseConfig) -> Result<Self, CacheError> {
        Self::new(&config.path).await
    }

    /// Opens (creating if needed) the database file at `db_path`
    ///
    /// Missing parent directories are created first.
    ///
    /// # Errors
    ///
    /// [`CacheError::ConnectionFailed`] if the file cannot be opened,
    /// [`CacheError::MigrationFailed`] if the schema cannot be applied.
    pub async fn new(db_path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                CacheError::ConnectionFailed(format!("{}: {}", parent.display(), e))
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_FILE_CONNECTIONS)
            .connect_with(options)
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("{}: {}", db_path.display(), e)))?;

        let db = Self::with_schema(pool).await?;
        tracing::info!(path = %db_path.display(), "Account database opened");
        Ok(db)
    }

    /// Opens a private in-memory database
    ///
    /// The pool holds exactly one connection that is never recycled; an
    /// in-memory SQLite database lives and dies with its connection.
    pub async fn in_memory() -> Result<Self, CacheError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| CacheError::ConnectionFailed(format!("in-memory database: {}", e)))?;

        Self::with_schema(pool).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Waits for checked-out connections and closes the pool
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("Account database closed");
    }

    async fn with_schema(pool: SqlitePool) -> Result<Self, CacheError> {
        sqlx::raw_sql(ACCOUNTS_SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| CacheError::MigrationFailed(format!("accounts schema: {}", e)))?;
        Ok(Self { pool })
    }
}
