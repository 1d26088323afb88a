//! Database operations for the single `webhook_subscriptions` row.
//!
//! Every write bumps `revision`. Poll bookkeeping uses it as a
//! compare-and-swap token so a poll never overwrites a registration that
//! landed while the poll was in flight.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::instrument;

use crate::DbError;

const SELECT_COLUMNS: &str = "subscription_id, base_id, table_id, callback_url, created_at, \
                              last_checked_at, payload_cursor, revision";

/// A row from the `webhook_subscriptions` table.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct WebhookSubscriptionRow {
    pub subscription_id: String,
    pub base_id: String,
    pub table_id: String,
    pub callback_url: String,
    pub created_at: DateTime<Utc>,
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Cursor of the last acknowledged payload batch.
    pub payload_cursor: Option<i64>,
    pub revision: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct NewWebhookSubscription<'a> {
    pub subscription_id: &'a str,
    pub base_id: &'a str,
    pub table_id: &'a str,
    pub callback_url: &'a str,
}

/// Store a freshly registered subscription, replacing any previous one.
///
/// `last_checked_at` and the payload cursor are reset because they belong
/// to the subscription being replaced.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails.
#[instrument(skip_all, fields(subscription_id = new.subscription_id))]
pub async fn upsert_webhook_subscription(
    pool: &SqlitePool,
    new: NewWebhookSubscription<'_>,
    created_at: DateTime<Utc>,
) -> Result<WebhookSubscriptionRow, DbError> {
    let row = sqlx::query_as::<_, WebhookSubscriptionRow>(&format!(
        "INSERT INTO webhook_subscriptions \
             (id, subscription_id, base_id, table_id, callback_url, created_at, revision) \
         VALUES (1, ?, ?, ?, ?, ?, 1) \
         ON CONFLICT (id) DO UPDATE SET \
             subscription_id = excluded.subscription_id, \
             base_id = excluded.base_id, \
             table_id = excluded.table_id, \
             callback_url = excluded.callback_url, \
             created_at = excluded.created_at, \
             last_checked_at = NULL, \
             payload_cursor = NULL, \
             revision = webhook_subscriptions.revision + 1 \
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(new.subscription_id)
    .bind(new.base_id)
    .bind(new.table_id)
    .bind(new.callback_url)
    .bind(created_at)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch the stored subscription, if one has been registered.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_webhook_subscription(
    pool: &SqlitePool,
) -> Result<Option<WebhookSubscriptionRow>, DbError> {
    let row = sqlx::query_as::<_, WebhookSubscriptionRow>(&format!(
        "SELECT {SELECT_COLUMNS} FROM webhook_subscriptions WHERE id = 1"
    ))
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Record a successful poll: set `last_checked_at` and, when given, the new
/// payload cursor. The subscription id is never touched.
///
/// Applies only if the row still carries `expected_revision`.
///
/// # Errors
///
/// Returns [`DbError::RevisionConflict`] if the row changed since it was
/// read, [`DbError::NotFound`] if no row exists, or [`DbError::Sqlx`] on
/// query failure.
#[instrument(skip_all, fields(expected_revision = expected_revision))]
pub async fn record_webhook_poll(
    pool: &SqlitePool,
    expected_revision: i64,
    checked_at: DateTime<Utc>,
    payload_cursor: Option<i64>,
) -> Result<WebhookSubscriptionRow, DbError> {
    let updated = sqlx::query_as::<_, WebhookSubscriptionRow>(&format!(
        "UPDATE webhook_subscriptions \
         SET last_checked_at = ?, \
             payload_cursor = COALESCE(?, payload_cursor), \
             revision = revision + 1 \
         WHERE id = 1 AND revision = ? \
         RETURNING {SELECT_COLUMNS}"
    ))
    .bind(checked_at)
    .bind(payload_cursor)
    .bind(expected_revision)
    .fetch_optional(pool)
    .await?;

    match updated {
        Some(row) => Ok(row),
        None if get_webhook_subscription(pool).await?.is_some() => {
            Err(DbError::RevisionConflict { expected_revision })
        }
        None => Err(DbError::NotFound),
    }
}
