//! One-shot webhook poller.
//!
//! Fetches pending payloads for the stored subscription, forwards each to the
//! sync endpoint, parks failures as dead letters, acknowledges the batch and
//! records the poll. Scheduling is the caller's job (cron, admin endpoint).

use chrono::{DateTime, Utc};
use labsync_airtable::AirtableClient;
use labsync_db::{
    get_webhook_subscription, insert_dead_letter, list_pending_dead_letters,
    mark_dead_letter_replayed, record_dead_letter_failure, record_sync_status, record_webhook_poll,
    DbError, SyncOutcome, WebhookSubscriptionRow,
};
use sqlx::SqlitePool;

use crate::error::SyncError;
use crate::forwarder::SyncForwarder;

/// Upper bound on payload pages fetched in one poll when Airtable reports
/// `mightHaveMore`.
const MAX_PAYLOAD_PAGES: usize = 10;

/// Attempts at the compare-and-swap poll update before giving up.
const MAX_RECORD_ATTEMPTS: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub subscription_id: String,
    pub fetched: usize,
    pub forwarded: usize,
    pub dead_lettered: usize,
    /// Cursor stored after this poll, if any payloads were seen.
    pub cursor: Option<i64>,
    pub acknowledged: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
    /// A registration replaced the subscription while this poll ran; the
    /// poll was not recorded against the new subscription.
    pub superseded: bool,
}

/// Poll the stored subscription once.
///
/// `last_checked_at` is updated whenever the first payload fetch succeeds,
/// including when it returns nothing. The subscription id is never changed.
/// A failed fetch or any dead-lettered payload marks the sync status `error`.
///
/// # Errors
///
/// - [`SyncError::NoSubscription`] if nothing is registered.
/// - [`SyncError::Airtable`] if the first payload fetch fails; only the sync
///   status (as `error`) is written in that case.
/// - [`SyncError::Db`] if a dead letter or the poll record cannot be written.
pub async fn poll_webhook(
    airtable: &AirtableClient,
    pool: &SqlitePool,
    forwarder: &SyncForwarder,
) -> Result<PollOutcome, SyncError> {
    let sub = get_webhook_subscription(pool)
        .await?
        .ok_or(SyncError::NoSubscription)?;
    let webhook_id = sub.subscription_id.clone();

    let mut outcome = PollOutcome {
        subscription_id: webhook_id.clone(),
        ..PollOutcome::default()
    };
    let mut cursor = sub.payload_cursor;

    for page_number in 0..MAX_PAYLOAD_PAGES {
        let page = match airtable.list_payloads(&webhook_id, cursor).await {
            Ok(page) => page,
            Err(e) if page_number == 0 => {
                tracing::error!(subscription_id = %webhook_id, error = %e, "payload fetch failed");
                note_sync_failure(pool, 0, &format!("payload fetch failed: {e}")).await;
                return Err(e.into());
            }
            Err(e) => {
                tracing::warn!(
                    subscription_id = %webhook_id,
                    error = %e,
                    "payload fetch failed mid-poll, keeping progress so far"
                );
                break;
            }
        };

        outcome.fetched += page.payloads.len();
        for payload in &page.payloads {
            match forwarder.forward(&sub.base_id, &webhook_id, payload).await {
                Ok(()) => outcome.forwarded += 1,
                Err(e) => {
                    tracing::warn!(
                        subscription_id = %webhook_id,
                        error = %e,
                        "payload forward failed, storing dead letter"
                    );
                    insert_dead_letter(pool, &webhook_id, payload, &e.to_string(), Utc::now())
                        .await?;
                    outcome.dead_lettered += 1;
                }
            }
        }

        if page.payloads.is_empty() {
            break;
        }

        if let Some(next) = page.cursor {
            match airtable.ack_payloads(&webhook_id, next).await {
                Ok(()) => outcome.acknowledged = true,
                Err(e) => {
                    tracing::warn!(
                        subscription_id = %webhook_id,
                        cursor = next,
                        error = %e,
                        "payload acknowledgement failed"
                    );
                }
            }
            cursor = Some(next);
            outcome.cursor = Some(next);
        }

        if !page.might_have_more {
            break;
        }
    }

    if outcome.dead_lettered > 0 {
        let message = format!(
            "{} of {} payload(s) could not be forwarded",
            outcome.dead_lettered, outcome.fetched
        );
        let count = i64::try_from(outcome.dead_lettered).unwrap_or(i64::MAX);
        note_sync_failure(pool, count, &message).await;
    }

    record_poll(pool, &sub, outcome.cursor, &mut outcome).await?;

    tracing::info!(
        subscription_id = %webhook_id,
        fetched = outcome.fetched,
        forwarded = outcome.forwarded,
        dead_lettered = outcome.dead_lettered,
        "webhook poll complete"
    );
    Ok(outcome)
}

/// Mark the last sync as failed. A write failure is only logged.
async fn note_sync_failure(pool: &SqlitePool, record_count: i64, message: &str) {
    if let Err(e) =
        record_sync_status(pool, SyncOutcome::Error, record_count, Some(message), Utc::now()).await
    {
        tracing::warn!(error = %e, "failed to record sync status");
    }
}

/// Write `last_checked_at` (and the cursor) with compare-and-swap, retrying
/// while the row changes underneath but still names the same subscription.
async fn record_poll(
    pool: &SqlitePool,
    sub: &WebhookSubscriptionRow,
    cursor: Option<i64>,
    outcome: &mut PollOutcome,
) -> Result<(), SyncError> {
    let mut revision = sub.revision;

    for _ in 0..MAX_RECORD_ATTEMPTS {
        let checked_at = Utc::now();
        match record_webhook_poll(pool, revision, checked_at, cursor).await {
            Ok(row) => {
                outcome.last_checked_at = row.last_checked_at;
                return Ok(());
            }
            Err(DbError::RevisionConflict { .. }) => {
                let Some(current) = get_webhook_subscription(pool).await? else {
                    return Err(DbError::NotFound.into());
                };
                if current.subscription_id != sub.subscription_id {
                    tracing::warn!(
                        polled = %sub.subscription_id,
                        current = %current.subscription_id,
                        "subscription replaced during poll, not recording"
                    );
                    outcome.superseded = true;
                    return Ok(());
                }
                revision = current.revision;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(DbError::RevisionConflict {
        expected_revision: revision,
    }
    .into())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayOutcome {
    pub attempted: usize,
    pub replayed: usize,
    pub failed: usize,
}

/// Re-forward up to `limit` pending dead letters, oldest first.
///
/// # Errors
///
/// Returns [`SyncError::Db`] if the dead-letter table cannot be read or
/// updated. Forward failures are counted, not returned.
pub async fn replay_dead_letters(
    pool: &SqlitePool,
    forwarder: &SyncForwarder,
    base_id: &str,
    limit: i64,
) -> Result<ReplayOutcome, SyncError> {
    let pending = list_pending_dead_letters(pool, limit).await?;
    let mut outcome = ReplayOutcome::default();

    for letter in pending {
        outcome.attempted += 1;
        match forwarder
            .forward(base_id, &letter.subscription_id, &letter.payload.0)
            .await
        {
            Ok(()) => {
                mark_dead_letter_replayed(pool, letter.id, Utc::now()).await?;
                outcome.replayed += 1;
            }
            Err(e) => {
                tracing::warn!(dead_letter_id = letter.id, error = %e, "replay failed");
                record_dead_letter_failure(pool, letter.id, &e.to_string()).await?;
                outcome.failed += 1;
            }
        }
    }

    tracing::info!(
        attempted = outcome.attempted,
        replayed = outcome.replayed,
        failed = outcome.failed,
        "dead letter replay complete"
    );
    Ok(outcome)
}
