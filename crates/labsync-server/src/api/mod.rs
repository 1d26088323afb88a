mod blog;
mod catalog;
mod contact;
mod newsletter;
mod search;
mod sync;
mod webhook;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, MethodRouter},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use labsync_airtable::{AirtableClient, AirtableError};
use labsync_core::{AppConfig, Article};
use labsync_newsletter::NewsletterClient;
use labsync_sync::{SyncError, SyncForwarder};
use serde::Serialize;
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;

use crate::cache::{CatalogCache, PageCache};
use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Arc<AppConfig>,
    pub airtable: Arc<AirtableClient>,
    pub forwarder: Arc<SyncForwarder>,
    /// `None` when no newsletter API key is configured.
    pub newsletter: Option<Arc<NewsletterClient>>,
    pub articles: Arc<Vec<Article>>,
    pub pages: Arc<PageCache>,
    pub catalog: Arc<CatalogCache>,
}

impl AppState {
    /// Wire clients and caches from configuration.
    pub fn from_config(
        pool: SqlitePool,
        config: Arc<AppConfig>,
        articles: Vec<Article>,
    ) -> anyhow::Result<Self> {
        let airtable = AirtableClient::from_app_config(&config)?;
        let forwarder = SyncForwarder::from_app_config(&config)?;
        let newsletter = NewsletterClient::from_app_config(&config)?;
        let catalog = CatalogCache::new(Duration::from_secs(config.catalog_ttl_secs));

        Ok(Self {
            pool,
            airtable: Arc::new(airtable),
            forwarder: Arc::new(forwarder),
            newsletter: newsletter.map(Arc::new),
            articles: Arc::new(articles),
            pages: Arc::new(PageCache::default()),
            catalog: Arc::new(catalog),
            config,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(data: T, request_id: String) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            "upstream_error" => StatusCode::BAD_GATEWAY,
            "service_unavailable" => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &labsync_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

pub(super) fn map_airtable_error(request_id: String, error: &AirtableError) -> ApiError {
    tracing::error!(error = %error, "airtable request failed");
    ApiError::new(request_id, "upstream_error", "product catalog unavailable")
}

pub(super) fn map_sync_error(request_id: String, error: &SyncError) -> ApiError {
    match error {
        SyncError::NoSubscription => {
            ApiError::new(request_id, "not_found", "no webhook subscription registered")
        }
        SyncError::Airtable(e) => {
            tracing::error!(error = %e, "airtable webhook call failed");
            ApiError::new(request_id, "upstream_error", e.to_string())
        }
        SyncError::Db(e) => map_db_error(request_id, e),
        SyncError::ForwarderSetup(e) => {
            tracing::error!(error = %e, "sync forwarder unavailable");
            ApiError::new(request_id, "internal_error", "sync forwarder unavailable")
        }
    }
}

pub(super) fn to_json_value<T: Serialize>(
    request_id: &str,
    value: &T,
) -> Result<serde_json::Value, ApiError> {
    serde_json::to_value(value).map_err(|e| {
        tracing::error!(error = %e, "response serialization failed");
        ApiError::new(request_id, "internal_error", "response serialization failed")
    })
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

/// Auth, then rate limiting, for the webhook admin routes.
#[derive(Clone)]
struct AdminGuard {
    auth: AuthState,
    rate_limit: RateLimitState,
}

impl AdminGuard {
    fn wrap(&self, route: MethodRouter<AppState>) -> MethodRouter<AppState> {
        route.layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    self.auth.clone(),
                    require_bearer_auth,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    self.rate_limit.clone(),
                    enforce_rate_limit,
                )),
        )
    }
}

fn webhook_router(guard: &AdminGuard) -> Router<AppState> {
    Router::new()
        .route("/sync", post(sync::receive_sync))
        .route("/webhook/register", guard.wrap(post(webhook::register)))
        .route("/webhook/poll", guard.wrap(post(webhook::poll)))
        .route(
            "/webhook/test",
            get(webhook::show_subscription).merge(guard.wrap(post(webhook::reregister))),
        )
}

fn public_router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/products", get(catalog::list_products))
        .route("/api/v1/products/{slug}", get(catalog::get_product))
        .route("/api/v1/shop", get(catalog::shop))
        .route("/api/v1/categories/{slug}", get(catalog::category))
        .route("/api/v1/search", get(search::search))
        .route("/api/v1/blog", get(blog::list_articles))
        .route("/api/v1/blog/{slug}", get(blog::get_article))
        .route(
            "/api/v1/newsletter/subscribe",
            post(newsletter::subscribe),
        )
        .route("/api/v1/contact", post(contact::submit))
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let guard = AdminGuard { auth, rate_limit };

    Router::new()
        .merge(public_router())
        .merge(webhook_router(&guard))
        .layer(
            ServiceBuilder::new()
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match labsync_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(30, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
