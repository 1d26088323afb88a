use axum::{extract::State, Extension, Json};
use chrono::Utc;
use labsync_db::{insert_contact_submission, NewContactSubmission};
use labsync_newsletter::is_plausible_email;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ContactRequest {
    #[serde(default, alias = "firstName")]
    first_name: String,
    #[serde(default, alias = "lastName")]
    last_name: Option<String>,
    #[serde(default)]
    email: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    message: String,
}

impl ContactRequest {
    /// Name of the first required field left blank.
    fn missing_field(&self) -> Option<&'static str> {
        [
            ("first_name", &self.first_name),
            ("email", &self.email),
            ("subject", &self.subject),
            ("message", &self.message),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
    }
}

#[derive(Debug, Serialize)]
pub(super) struct ContactData {
    id: i64,
    received: bool,
}

pub(super) async fn submit(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(request): Json<ContactRequest>,
) -> Result<Json<ApiResponse<ContactData>>, ApiError> {
    if let Some(field) = request.missing_field() {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            format!("{field} is required"),
        ));
    }
    if !is_plausible_email(&request.email) {
        return Err(ApiError::new(
            req_id.0,
            "validation_error",
            "a valid email address is required",
        ));
    }

    let id = insert_contact_submission(
        &state.pool,
        NewContactSubmission {
            first_name: request.first_name.trim(),
            last_name: request
                .last_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty()),
            email: request.email.trim(),
            subject: request.subject.trim(),
            message: request.message.trim(),
        },
        Utc::now(),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    tracing::info!(submission_id = id, "contact submission stored");
    Ok(Json(ApiResponse::new(
        ContactData { id, received: true },
        req_id.0,
    )))
}
