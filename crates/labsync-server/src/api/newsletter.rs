use axum::{extract::State, Extension, Json};
use labsync_newsletter::is_plausible_email;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SubscribeRequest {
    #[serde(default)]
    email: String,
    #[serde(default, alias = "firstName")]
    first_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SubscribeData {
    subscribed: bool,
    already_subscribed: bool,
}

pub(super) async fn subscribe(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<SubscribeRequest>,
) -> Result<Json<ApiResponse<SubscribeData>>, ApiError> {
    let Some(client) = state.newsletter.as_deref() else {
        return Err(ApiError::new(
            req_id.0,
            "service_unavailable",
            "newsletter signup is not configured",
        ));
    };

    if !is_plausible_email(&request.email) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "a valid email address is required",
        ));
    }

    let subscription = client
        .subscribe(&request.email, request.first_name.as_deref())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "newsletter subscribe failed");
            ApiError::new(req_id.0.clone(), "upstream_error", "newsletter signup failed")
        })?;

    Ok(Json(ApiResponse::new(
        SubscribeData {
            subscribed: true,
            already_subscribed: subscription.already_subscribed,
        },
        req_id.0,
    )))
}
