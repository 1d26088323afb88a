use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use labsync_core::{filter_groups, ProductFilter, ProductGroup};
use labsync_sync::{category_path, product_path, PRODUCTS_PATH, SHOP_PATH};
use serde::Serialize;
use serde_json::Value;

use crate::cache::CatalogSnapshot;
use crate::middleware::RequestId;

use super::{map_airtable_error, to_json_value, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
struct CategorySummary<'a> {
    name: &'a str,
    slug: &'a str,
    product_count: usize,
}

#[derive(Debug, Serialize)]
struct ShopPage<'a> {
    categories: Vec<CategorySummary<'a>>,
    featured: Vec<&'a ProductGroup>,
    products: &'a [ProductGroup],
}

#[derive(Debug, Serialize)]
struct CategoryPage<'a> {
    name: &'a str,
    slug: &'a str,
    products: Vec<&'a ProductGroup>,
}

pub(super) async fn load_snapshot(
    state: &AppState,
    request_id: &str,
) -> Result<Arc<CatalogSnapshot>, ApiError> {
    state
        .catalog
        .load(&state.airtable, &state.config.airtable_table_id)
        .await
        .map_err(|e| map_airtable_error(request_id.to_string(), &e))
}

fn page_ttl(state: &AppState) -> Duration {
    Duration::from_secs(state.config.page_ttl_secs)
}

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    // Only the unfiltered listing is cached; it is the page sync revalidates.
    if filter.is_empty() {
        if let Some(body) = state.pages.get(PRODUCTS_PATH).await {
            return Ok(Json(ApiResponse::new(body, req_id.0)));
        }
    }

    let epoch = state.pages.epoch();
    let snapshot = load_snapshot(&state, &req_id.0).await?;
    let body = to_json_value(&req_id.0, &filter_groups(&snapshot.groups, &filter))?;

    if filter.is_empty() {
        state
            .pages
            .insert_at(epoch, PRODUCTS_PATH, body.clone(), page_ttl(&state))
            .await;
    }

    Ok(Json(ApiResponse::new(body, req_id.0)))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let key = product_path(&slug);
    if let Some(body) = state.pages.get(&key).await {
        return Ok(Json(ApiResponse::new(body, req_id.0)));
    }

    let epoch = state.pages.epoch();
    let snapshot = load_snapshot(&state, &req_id.0).await?;
    let Some(group) = snapshot.find(&slug) else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("product {slug} not found"),
        ));
    };

    let body = to_json_value(&req_id.0, group)?;
    state
        .pages
        .insert_at(
            epoch,
            key,
            body.clone(),
            Duration::from_secs(state.config.detail_ttl_secs),
        )
        .await;

    Ok(Json(ApiResponse::new(body, req_id.0)))
}

pub(super) async fn shop(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    if let Some(body) = state.pages.get(SHOP_PATH).await {
        return Ok(Json(ApiResponse::new(body, req_id.0)));
    }

    let epoch = state.pages.epoch();
    let snapshot = load_snapshot(&state, &req_id.0).await?;
    let categories = snapshot
        .category_slugs()
        .into_iter()
        .filter_map(|slug| {
            let in_category: Vec<&ProductGroup> = snapshot
                .groups
                .iter()
                .filter(|g| g.category_slug == slug)
                .collect();
            in_category.first().copied().map(|first| CategorySummary {
                name: &first.category,
                slug,
                product_count: in_category.len(),
            })
        })
        .collect();
    let page = ShopPage {
        categories,
        featured: snapshot.groups.iter().filter(|g| g.featured).collect(),
        products: &snapshot.groups,
    };

    let body = to_json_value(&req_id.0, &page)?;
    state
        .pages
        .insert_at(epoch, SHOP_PATH, body.clone(), page_ttl(&state))
        .await;

    Ok(Json(ApiResponse::new(body, req_id.0)))
}

pub(super) async fn category(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let key = category_path(&slug);
    if let Some(body) = state.pages.get(&key).await {
        return Ok(Json(ApiResponse::new(body, req_id.0)));
    }

    let epoch = state.pages.epoch();
    let snapshot = load_snapshot(&state, &req_id.0).await?;
    let products: Vec<&ProductGroup> = snapshot
        .groups
        .iter()
        .filter(|g| g.category_slug == slug)
        .collect();
    let Some(&first) = products.first() else {
        return Err(ApiError::new(
            req_id.0,
            "not_found",
            format!("category {slug} not found"),
        ));
    };

    let page = CategoryPage {
        name: &first.category,
        slug: &slug,
        products,
    };
    let body = to_json_value(&req_id.0, &page)?;
    state
        .pages
        .insert_at(epoch, key, body.clone(), page_ttl(&state))
        .await;

    Ok(Json(ApiResponse::new(body, req_id.0)))
}
