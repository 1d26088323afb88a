use axum::{
    body::Bytes,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap},
    Extension, Json,
};
use chrono::Utc;
use labsync_db::{record_sync_status, SyncOutcome};
use labsync_sync::{RevalidationPlan, WebhookNotification};
use serde::Serialize;

use crate::middleware::{secrets_match, RequestId};

use super::{ApiError, ApiResponse, AppState};

pub(super) const NO_CHANGES_MESSAGE: &str = "No changes to sync";

#[derive(Debug, Serialize)]
pub(super) struct SyncData {
    message: String,
    changed_records: usize,
    revalidated: Vec<String>,
}

/// Webhook receiver. Drops the listing pages and catalog snapshot when the
/// configured product table changed.
pub(super) async fn receive_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<SyncData>>, ApiError> {
    if let Some(secret) = state.config.webhook_secret.as_deref() {
        let presented = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !secrets_match(&format!("Bearer {secret}"), presented) {
            tracing::warn!("sync request rejected: missing or wrong secret");
            return Err(ApiError::new(
                req_id.0,
                "unauthorized",
                "missing or invalid webhook secret",
            ));
        }
    }

    let notification = WebhookNotification::parse_lenient(&body);
    let changed = notification.changed_record_ids(&state.config.airtable_table_id);
    tracing::info!(
        base_id = notification.base_id().unwrap_or("unknown"),
        webhook_id = notification.webhook_id().unwrap_or("unknown"),
        changed_records = changed.len(),
        "webhook received"
    );

    if changed.is_empty() {
        tracing::info!("no changes to sync");
        return Ok(Json(ApiResponse::new(
            SyncData {
                message: NO_CHANGES_MESSAGE.to_string(),
                changed_records: 0,
                revalidated: Vec::new(),
            },
            req_id.0,
        )));
    }

    let plan = RevalidationPlan::for_categories(&state.config.revalidate_categories);

    if let Some(snapshot) = state.catalog.peek().await {
        let uncovered = plan.uncovered_categories(snapshot.category_slugs());
        if !uncovered.is_empty() {
            tracing::warn!(
                categories = ?uncovered,
                "catalog has categories outside LABSYNC_REVALIDATE_CATEGORIES; their pages stay cached"
            );
        }
    }

    // Catalog first, so a page rendered after the invalidation cannot come
    // from the old snapshot.
    state.catalog.clear().await;
    let removed = state.pages.invalidate(plan.paths()).await;

    let record_count = i64::try_from(changed.len()).unwrap_or(i64::MAX);
    if let Err(e) = record_sync_status(
        &state.pool,
        SyncOutcome::Success,
        record_count,
        None,
        Utc::now(),
    )
    .await
    {
        tracing::warn!(error = %e, "failed to record sync status");
    }

    tracing::info!(
        changed_records = changed.len(),
        pages_dropped = removed,
        "revalidation done"
    );

    Ok(Json(ApiResponse::new(
        SyncData {
            message: format!("Revalidated {} pages", plan.paths().len()),
            changed_records: changed.len(),
            revalidated: plan.paths().to_vec(),
        },
        req_id.0,
    )))
}
