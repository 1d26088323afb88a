use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::DbError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Success,
    Error,
}

impl SyncOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// A row from the `sync_status` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncStatusRow {
    pub last_sync_at: DateTime<Utc>,
    pub record_count: i64,
    /// `success` or `error`.
    pub status: String,
    pub error_message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Overwrite the sync status with the outcome of the latest sync request.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
pub async fn record_sync_status(
    pool: &SqlitePool,
    outcome: SyncOutcome,
    record_count: i64,
    error_message: Option<&str>,
    at: DateTime<Utc>,
) -> Result<(), DbError> {
    sqlx::query(
        "INSERT INTO sync_status \
             (id, last_sync_at, record_count, status, error_message, updated_at) \
         VALUES (1, ?, ?, ?, ?, ?) \
         ON CONFLICT (id) DO UPDATE SET \
             last_sync_at = excluded.last_sync_at, \
             record_count = excluded.record_count, \
             status = excluded.status, \
             error_message = excluded.error_message, \
             updated_at = excluded.updated_at",
    )
    .bind(at)
    .bind(record_count)
    .bind(outcome.as_str())
    .bind(error_message)
    .bind(at)
    .execute(pool)
    .await?;

    Ok(())
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_sync_status(pool: &SqlitePool) -> Result<Option<SyncStatusRow>, DbError> {
    let row = sqlx::query_as::<_, SyncStatusRow>(
        "SELECT last_sync_at, record_count, status, error_message, updated_at \
         FROM sync_status WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
