use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::Utc;
use labsync_core::{generate_all, search::MIN_QUERY_LEN, SearchResults};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{catalog::load_snapshot, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SearchQuery {
    #[serde(default)]
    q: String,
}

pub(super) async fn search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<ApiResponse<SearchResults>>, ApiError> {
    // Short queries never reach the catalog.
    if query.q.trim().chars().count() < MIN_QUERY_LEN {
        let results = labsync_core::search(&query.q, &[], &[], &[]);
        return Ok(Json(ApiResponse::new(results, req_id.0)));
    }

    let snapshot = load_snapshot(&state, &req_id.0).await?;
    let generated = generate_all(&snapshot.groups, Utc::now().date_naive());
    let results = labsync_core::search(&query.q, &snapshot.groups, &state.articles, &generated);

    tracing::debug!(
        query = %results.query,
        total = results.total,
        "search served"
    );
    Ok(Json(ApiResponse::new(results, req_id.0)))
}
