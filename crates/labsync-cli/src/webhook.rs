//! Webhook command handlers. Each runs once and exits; cron provides the
//! schedule.

use chrono::{DateTime, Utc};
use labsync_airtable::AirtableClient;
use labsync_core::AppConfig;
use labsync_sync::{
    check_webhook_health, poll_webhook, register_webhook, replay_dead_letters, SyncForwarder,
};
use sqlx::SqlitePool;

/// Format an optional timestamp for display, returning `"never"` when `None`.
fn fmt_time(at: Option<DateTime<Utc>>) -> String {
    at.map_or_else(
        || "never".to_string(),
        |t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub(crate) async fn run_register(pool: &SqlitePool, config: &AppConfig) -> anyhow::Result<()> {
    let airtable = AirtableClient::from_app_config(config)?;
    let row = register_webhook(
        &airtable,
        pool,
        &config.airtable_table_id,
        &config.callback_url(),
    )
    .await?;

    println!(
        "registered webhook {} -> {}",
        row.subscription_id, row.callback_url
    );
    Ok(())
}

pub(crate) async fn run_poll(pool: &SqlitePool, config: &AppConfig) -> anyhow::Result<()> {
    let airtable = AirtableClient::from_app_config(config)?;
    let forwarder = SyncForwarder::from_app_config(config)?;
    let outcome = poll_webhook(&airtable, pool, &forwarder).await?;

    if outcome.superseded {
        println!(
            "webhook {} was replaced during the poll; nothing recorded",
            outcome.subscription_id
        );
        return Ok(());
    }

    println!(
        "polled {}: fetched {}, forwarded {}, dead-lettered {}{}",
        outcome.subscription_id,
        outcome.fetched,
        outcome.forwarded,
        outcome.dead_lettered,
        outcome
            .cursor
            .map(|c| format!(", cursor {c}"))
            .unwrap_or_default()
    );
    Ok(())
}

/// Check hook health, optionally replacing a disabled hook.
///
/// # Errors
///
/// Returns an error if no webhook is stored, Airtable cannot be reached, or
/// re-registration fails.
pub(crate) async fn run_health(
    pool: &SqlitePool,
    config: &AppConfig,
    reregister: bool,
) -> anyhow::Result<()> {
    let airtable = AirtableClient::from_app_config(config)?;
    let health = check_webhook_health(&airtable, pool).await?;

    if health.enabled {
        println!("webhook {} is enabled", health.subscription_id);
        return Ok(());
    }

    println!("webhook {} is disabled or missing", health.subscription_id);
    if reregister {
        tracing::info!(subscription_id = %health.subscription_id, "re-registering webhook");
        let row = register_webhook(
            &airtable,
            pool,
            &config.airtable_table_id,
            &config.callback_url(),
        )
        .await?;
        println!("registered replacement webhook {}", row.subscription_id);
    } else {
        println!("run `health --reregister` or `register` to replace it");
    }
    Ok(())
}

pub(crate) async fn run_replay(
    pool: &SqlitePool,
    config: &AppConfig,
    limit: i64,
) -> anyhow::Result<()> {
    let forwarder = SyncForwarder::from_app_config(config)?;
    let outcome = replay_dead_letters(pool, &forwarder, &config.airtable_base_id, limit).await?;

    println!(
        "replayed {} of {} dead letter(s), {} still failing",
        outcome.replayed, outcome.attempted, outcome.failed
    );
    Ok(())
}

pub(crate) async fn run_status(pool: &SqlitePool, config: &AppConfig) -> anyhow::Result<()> {
    match labsync_db::get_webhook_subscription(pool).await? {
        Some(sub) => {
            println!("webhook:       {}", sub.subscription_id);
            println!("callback:      {}", sub.callback_url);
            println!("registered:    {}", fmt_time(Some(sub.created_at)));
            println!("last checked:  {}", fmt_time(sub.last_checked_at));
            println!(
                "cursor:        {}",
                sub.payload_cursor
                    .map_or_else(|| "none".to_string(), |c| c.to_string())
            );
        }
        None => println!(
            "no webhook registered; run `register` (callback would be {})",
            config.callback_url()
        ),
    }

    match labsync_db::get_sync_status(pool).await? {
        Some(status) => println!(
            "last sync:     {} ({}, {} record(s){})",
            fmt_time(Some(status.last_sync_at)),
            status.status,
            status.record_count,
            status
                .error_message
                .map(|m| format!(": {m}"))
                .unwrap_or_default()
        ),
        None => println!("last sync:     never"),
    }

    let pending = labsync_db::count_pending_dead_letters(pool).await?;
    println!("dead letters:  {pending} pending");
    Ok(())
}
