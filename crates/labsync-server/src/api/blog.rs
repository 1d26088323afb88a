use std::collections::HashSet;

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use chrono::{NaiveDate, Utc};
use labsync_core::{generate_all, GeneratedArticle};
use serde::Serialize;
use serde_json::Value;

use crate::middleware::RequestId;

use super::{catalog::load_snapshot, to_json_value, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct ArticleSummary {
    slug: String,
    title: String,
    excerpt: String,
    category: String,
    author: String,
    published_on: NaiveDate,
    read_time: Option<String>,
    generated: bool,
}

/// Product-derived articles, or none when the catalog cannot be loaded.
async fn generated_articles(state: &AppState, request_id: &str) -> Vec<GeneratedArticle> {
    match load_snapshot(state, request_id).await {
        Ok(snapshot) => generate_all(&snapshot.groups, Utc::now().date_naive()),
        Err(_) => {
            tracing::warn!("catalog unavailable, listing hand-authored articles only");
            Vec::new()
        }
    }
}

pub(super) async fn list_articles(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<ArticleSummary>>> {
    let generated = generated_articles(&state, &req_id.0).await;
    let authored: HashSet<&str> = state.articles.iter().map(|a| a.slug.as_str()).collect();

    let mut data: Vec<ArticleSummary> = state
        .articles
        .iter()
        .map(|a| ArticleSummary {
            slug: a.slug.clone(),
            title: a.title.clone(),
            excerpt: a.description.clone(),
            category: a.category.clone(),
            author: a.author.clone(),
            published_on: a.published_on,
            read_time: a.read_time.clone(),
            generated: false,
        })
        .collect();
    data.extend(
        generated
            .into_iter()
            .filter(|g| !authored.contains(g.slug.as_str()))
            .map(|g| ArticleSummary {
                slug: g.slug,
                title: g.title,
                excerpt: g.meta_description,
                category: g.category,
                author: g.author,
                published_on: g.published_on,
                read_time: Some(g.read_time),
                generated: true,
            }),
    );

    Json(ApiResponse::new(data, req_id.0))
}

/// Hand-authored article by slug, falling back to the generated one.
pub(super) async fn get_article(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    if let Some(article) = state.articles.iter().find(|a| a.slug == slug) {
        let body = to_json_value(&req_id.0, article)?;
        return Ok(Json(ApiResponse::new(body, req_id.0)));
    }

    // A catalog outage is a 502 here, not a 404.
    let snapshot = load_snapshot(&state, &req_id.0).await?;
    let generated = generate_all(&snapshot.groups, Utc::now().date_naive());
    match generated.iter().find(|g| g.slug == slug) {
        Some(article) => {
            let body = to_json_value(&req_id.0, article)?;
            Ok(Json(ApiResponse::new(body, req_id.0)))
        }
        None => Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("article {slug} not found"),
        )),
    }
}
