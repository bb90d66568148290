//! SQLite implementation of IAccountRepository
//!
//! ## Type Mapping
//!
//! | Domain Type     | SQL Type | Strategy                                     |
//! |-----------------|----------|----------------------------------------------|
//! | local id        | INTEGER  | primary key                                  |
//! | RemoteId        | TEXT     | `.as_str()` / `RemoteId::new()`, nullable    |
//! | NaiveDate       | TEXT     | `YYYY-MM-DD`                                 |
//! | DateTime<Utc>   | TEXT     | RFC 3339, UTC, fixed microsecond precision   |
//!
//! Timestamps are written with a fixed width so that the `>=` comparison in
//! `find_modified_since` orders correctly as plain text.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crmsync_core::domain::{AccountRecord, RemoteId};
use crmsync_core::ports::IAccountRepository;

use crate::CacheError;

const SELECT_COLUMNS: &str =
    "SELECT id, given_name, family_name, birth_date, email, remote_id, last_modified FROM accounts";

/// SQLite-based implementation of the account repository port
pub struct SqliteAccountRepository {
    pool: SqlitePool,
}

impl SqliteAccountRepository {
    /// Creates a new repository instance with the given connection pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts or replaces a single record
    pub async fn save(&self, record: &AccountRecord) -> Result<(), CacheError> {
        upsert(&self.pool, record).await?;
        tracing::trace!(local_id = record.local_id(), "Saved account");
        Ok(())
    }

    /// Loads a record by local id
    pub async fn get(&self, local_id: i64) -> Result<Option<AccountRecord>, CacheError> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(local_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => Ok(Some(account_from_row(r)?)),
            None => Ok(None),
        }
    }

    /// Number of stored records
    pub async fn count(&self) -> Result<i64, CacheError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM accounts")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// ============================================================================
// Helper functions for type conversion
// ============================================================================

/// Format a timestamp for storage
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored RFC 3339 timestamp
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            CacheError::SerializationError(format!("Failed to parse datetime '{}': {}", s, e))
        })
}

fn parse_date(s: &str) -> Result<NaiveDate, CacheError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        CacheError::SerializationError(format!("Failed to parse date '{}': {}", s, e))
    })
}

/// Reconstruct an AccountRecord from a database row
fn account_from_row(row: &SqliteRow) -> Result<AccountRecord, CacheError> {
    let id: i64 = row.get("id");
    let given_name: String = row.get("given_name");
    let family_name: String = row.get("family_name");
    let birth_date_str: Option<String> = row.get("birth_date");
    let email: Option<String> = row.get("email");
    let remote_id_str: Option<String> = row.get("remote_id");
    let last_modified_str: String = row.get("last_modified");

    let mut record = AccountRecord::new(id, given_name, family_name)
        .with_last_modified(parse_datetime(&last_modified_str)?);

    if let Some(email) = email {
        record = record.with_email(email);
    }
    if let Some(date) = birth_date_str.filter(|s| !s.is_empty()) {
        record = record.with_birth_date(parse_date(&date)?);
    }
    if let Some(remote) = remote_id_str.filter(|s| !s.is_empty()) {
        let remote_id = RemoteId::new(remote.clone()).map_err(|e| {
            CacheError::SerializationError(format!("Invalid RemoteId '{}': {}", remote, e))
        })?;
        record = record.with_remote_id(remote_id);
    }

    Ok(record)
}

async fn upsert<'e, E>(executor: E, record: &AccountRecord) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        "INSERT INTO accounts \
         (id, given_name, family_name, birth_date, email, remote_id, last_modified) \
         VALUES (?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(id) DO UPDATE SET \
           given_name = excluded.given_name, \
           family_name = excluded.family_name, \
           birth_date = excluded.birth_date, \
           email = excluded.email, \
           remote_id = excluded.remote_id, \
           last_modified = excluded.last_modified",
    )
    .bind(record.local_id())
    .bind(record.given_name())
    .bind(record.family_name())
    .bind(record.birth_date().map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(record.email())
    .bind(record.remote_id().map(RemoteId::as_str))
    .bind(format_datetime(&record.last_modified()))
    .execute(executor)
    .await?;
    Ok(())
}

// ============================================================================
// IAccountRepository implementation
// ============================================================================

#[async_trait::async_trait]
impl IAccountRepository for SqliteAccountRepository {
    async fn find_modified_since(
        &self,
        since: DateTime<Utc>,
    ) -> anyhow::Result<Vec<AccountRecord>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE last_modified >= ? ORDER BY id"
        ))
        .bind(format_datetime(&since))
        .fetch_all(&self.pool)
        .await?;

        let records = rows
            .iter()
            .map(account_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(count = records.len(), since = %since, "Loaded modified accounts");
        Ok(records)
    }

    async fn persist(&self, records: &[AccountRecord]) -> anyhow::Result<()> {
        let mut tx = self.pool.begin().await?;
        for record in records {
            upsert(&mut *tx, record).await?;
        }
        tx.commit().await?;

        tracing::debug!(count = records.len(), "Persisted accounts");
        Ok(())
    }
}
