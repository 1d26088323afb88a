use chrono::Utc;
use labsync_airtable::AirtableClient;
use labsync_db::{
    get_webhook_subscription, upsert_webhook_subscription, NewWebhookSubscription,
    WebhookSubscriptionRow,
};
use sqlx::SqlitePool;

use crate::error::SyncError;

/// Create an upstream webhook for `table_id` and store it, replacing any
/// previously stored subscription.
///
/// Does not check for an existing subscription: calling this twice leaves
/// two subscriptions upstream and the second one stored.
///
/// # Errors
///
/// Returns [`SyncError::Airtable`] if the create call fails (nothing is
/// stored) or [`SyncError::Db`] if the row cannot be written.
pub async fn register_webhook(
    airtable: &AirtableClient,
    pool: &SqlitePool,
    table_id: &str,
    callback_url: &str,
) -> Result<WebhookSubscriptionRow, SyncError> {
    let created = match airtable.create_webhook(callback_url).await {
        Ok(created) => created,
        Err(e) => {
            tracing::error!(error = %e, callback_url, "webhook registration failed");
            return Err(e.into());
        }
    };

    let row = upsert_webhook_subscription(
        pool,
        NewWebhookSubscription {
            subscription_id: &created.id,
            base_id: airtable.base_id(),
            table_id,
            callback_url,
        },
        Utc::now(),
    )
    .await?;

    tracing::info!(
        subscription_id = %row.subscription_id,
        callback_url,
        "webhook registered"
    );
    Ok(row)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookHealth {
    pub subscription_id: String,
    pub enabled: bool,
}

/// Ask Airtable whether the stored subscription is still enabled.
///
/// A 404 from Airtable reports the hook as disabled rather than failing.
///
/// # Errors
///
/// Returns [`SyncError::NoSubscription`] if nothing is stored, or
/// [`SyncError::Airtable`] for any other upstream failure.
pub async fn check_webhook_health(
    airtable: &AirtableClient,
    pool: &SqlitePool,
) -> Result<HookHealth, SyncError> {
    let sub = get_webhook_subscription(pool)
        .await?
        .ok_or(SyncError::NoSubscription)?;

    let enabled = match airtable.get_webhook(&sub.subscription_id).await {
        Ok(info) => info.is_hook_enabled,
        Err(e) if e.status() == Some(404) => false,
        Err(e) => return Err(e.into()),
    };

    if enabled {
        tracing::debug!(subscription_id = %sub.subscription_id, "webhook healthy");
    } else {
        tracing::warn!(subscription_id = %sub.subscription_id, "webhook disabled or missing");
    }

    Ok(HookHealth {
        subscription_id: sub.subscription_id,
        enabled,
    })
}
