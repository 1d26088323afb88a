use axum::{extract::State, Extension, Json};
use chrono::{DateTime, Utc};
use labsync_db::WebhookSubscriptionRow;
use labsync_sync::{poll_webhook, register_webhook, PollOutcome};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, map_sync_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct SubscriptionItem {
    subscription_id: String,
    base_id: String,
    table_id: String,
    callback_url: String,
    created_at: DateTime<Utc>,
    last_checked_at: Option<DateTime<Utc>>,
    payload_cursor: Option<i64>,
}

impl From<WebhookSubscriptionRow> for SubscriptionItem {
    fn from(row: WebhookSubscriptionRow) -> Self {
        Self {
            subscription_id: row.subscription_id,
            base_id: row.base_id,
            table_id: row.table_id,
            callback_url: row.callback_url,
            created_at: row.created_at,
            last_checked_at: row.last_checked_at,
            payload_cursor: row.payload_cursor,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct PollItem {
    subscription_id: String,
    fetched: usize,
    forwarded: usize,
    dead_lettered: usize,
    cursor: Option<i64>,
    acknowledged: bool,
    last_checked_at: Option<DateTime<Utc>>,
    superseded: bool,
}

impl From<PollOutcome> for PollItem {
    fn from(outcome: PollOutcome) -> Self {
        Self {
            subscription_id: outcome.subscription_id,
            fetched: outcome.fetched,
            forwarded: outcome.forwarded,
            dead_lettered: outcome.dead_lettered,
            cursor: outcome.cursor,
            acknowledged: outcome.acknowledged,
            last_checked_at: outcome.last_checked_at,
            superseded: outcome.superseded,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct SubscriptionStatus {
    registered: bool,
    callback_url: String,
    subscription: Option<SubscriptionItem>,
    pending_dead_letters: i64,
}

pub(super) async fn register(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SubscriptionItem>>, ApiError> {
    let row = register_webhook(
        &state.airtable,
        &state.pool,
        &state.config.airtable_table_id,
        &state.config.callback_url(),
    )
    .await
    .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(row.into(), req_id.0)))
}

pub(super) async fn reregister(
    state: State<AppState>,
    req_id: Extension<RequestId>,
) -> Result<Json<ApiResponse<SubscriptionItem>>, ApiError> {
    tracing::info!("re-registering webhook on request");
    register(state, req_id).await
}

pub(super) async fn poll(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<PollItem>>, ApiError> {
    let outcome = poll_webhook(&state.airtable, &state.pool, &state.forwarder)
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(outcome.into(), req_id.0)))
}

pub(super) async fn show_subscription(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SubscriptionStatus>>, ApiError> {
    let row = labsync_db::get_webhook_subscription(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    let pending_dead_letters = labsync_db::count_pending_dead_letters(&state.pool)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(
        SubscriptionStatus {
            registered: row.is_some(),
            callback_url: state.config.callback_url(),
            subscription: row.map(SubscriptionItem::from),
            pending_dead_letters,
        },
        req_id.0,
    )))
}
