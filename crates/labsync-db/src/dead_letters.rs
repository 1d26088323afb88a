//! Payloads that could not be forwarded to the sync endpoint.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqlitePool;
use tracing::instrument;

use crate::DbError;

/// A row from the `dead_letters` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DeadLetterRow {
    pub id: i64,
    pub subscription_id: String,
    pub payload: Json<Value>,
    pub error_message: String,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
    pub replayed_at: Option<DateTime<Utc>>,
}

/// Park a payload that failed to forward. Returns the new row id.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
#[instrument(skip_all, fields(subscription_id = subscription_id))]
pub async fn insert_dead_letter(
    pool: &SqlitePool,
    subscription_id: &str,
    payload: &Value,
    error_message: &str,
    at: DateTime<Utc>,
) -> Result<i64, DbError> {
    let id = sqlx::query_scalar::<_, i64>(
        "INSERT INTO dead_letters (subscription_id, payload, error_message, created_at) \
         VALUES (?, ?, ?, ?) \
         RETURNING id",
    )
    .bind(subscription_id)
    .bind(Json(payload))
    .bind(error_message)
    .bind(at)
    .fetch_one(pool)
    .await?;

    Ok(id)
}

/// Oldest-first list of dead letters that have not been replayed.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_pending_dead_letters(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<DeadLetterRow>, DbError> {
    let rows = sqlx::query_as::<_, DeadLetterRow>(
        "SELECT id, subscription_id, payload, error_message, attempts, created_at, replayed_at \
         FROM dead_letters \
         WHERE replayed_at IS NULL \
         ORDER BY id \
         LIMIT ?",
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn count_pending_dead_letters(pool: &SqlitePool) -> Result<i64, DbError> {
    let count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM dead_letters WHERE replayed_at IS NULL")
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// # Errors
///
/// Returns [`DbError::NotFound`] if the id does not exist or was already
/// replayed, or [`DbError::Sqlx`] if the update fails.
pub async fn mark_dead_letter_replayed(
    pool: &SqlitePool,
    id: i64,
    at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE dead_letters SET replayed_at = ? WHERE id = ? AND replayed_at IS NULL",
    )
    .bind(at)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Record another failed replay attempt.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the id does not exist, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn record_dead_letter_failure(
    pool: &SqlitePool,
    id: i64,
    error_message: &str,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE dead_letters SET attempts = attempts + 1, error_message = ? WHERE id = ?",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
