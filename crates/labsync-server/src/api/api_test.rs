use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header::AUTHORIZATION, Request};
use labsync_core::{
    AppConfig, ChemicalInfo, Environment, ProductRecord, WarehouseLocation,
    DEFAULT_REVALIDATE_CATEGORIES, LIVE_VISIBILITY,
};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::*;

const TABLE_ID: &str = "tblTEST";
const CATEGORY: &str = "Cognitive & Neurological / Nootropic";

fn test_config(upstream: &str, webhook_secret: Option<&str>) -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".to_string(),
        env: Environment::Test,
        bind_addr: "127.0.0.1:0".parse().expect("addr"),
        log_level: "info".to_string(),
        site_url: upstream.to_string(),
        articles_path: PathBuf::from("./config/articles.yaml"),
        revalidate_categories: DEFAULT_REVALIDATE_CATEGORIES
            .iter()
            .map(ToString::to_string)
            .collect(),
        airtable_api_key: "pat-test".to_string(),
        airtable_base_id: "appTEST".to_string(),
        airtable_table_id: TABLE_ID.to_string(),
        airtable_api_url: upstream.to_string(),
        airtable_max_retries: 0,
        airtable_backoff_ms: 0,
        webhook_secret: webhook_secret.map(ToOwned::to_owned),
        convertkit_api_key: None,
        convertkit_form_id: None,
        convertkit_api_url: upstream.to_string(),
        catalog_ttl_secs: 60,
        page_ttl_secs: 3600,
        detail_ttl_secs: 60,
        http_timeout_secs: 5,
        user_agent: "labsync-test".to_string(),
    }
}

async fn test_state(config: AppConfig) -> AppState {
    let pool = labsync_db::connect_in_memory().await.expect("in-memory pool");
    AppState::from_config(pool, Arc::new(config), Vec::new()).expect("state")
}

fn open_app(state: AppState) -> Router {
    let auth = AuthState::from_keys("", true).expect("auth");
    build_app(state, auth, default_rate_limit_state())
}

fn record(name: &str, strength: &str, price: Decimal) -> ProductRecord {
    ProductRecord {
        record_id: format!("rec{}", name.len()),
        product_id: "1".to_string(),
        name: name.to_string(),
        slug: String::new(),
        variant_strength: strength.to_string(),
        category: CATEGORY.to_string(),
        price,
        in_stock: true,
        warehouse: WarehouseLocation::Overseas,
        sku: String::new(),
        short_description: format!("{name} research compound"),
        full_description: String::new(),
        chemical: ChemicalInfo::default(),
        image_url: None,
        certificate_url: None,
        featured: false,
        popularity_score: 0,
        stock_quantity: 5,
        unit_size: "1 Vial".to_string(),
        specification: None,
        shelf_life: None,
        research_applications: None,
        storage_requirements: None,
        handling_guidelines: None,
        discontinued: false,
        visibility: LIVE_VISIBILITY.to_string(),
    }
}

/// Warm every page the sync endpoint knows about plus one detail page.
async fn warm_caches(state: &AppState) {
    let ttl = Duration::from_secs(3600);
    state
        .catalog
        .store(&[record("Semax (5mg)", "5mg", Decimal::new(3000, 2))])
        .await;
    state.pages.insert("/shop", json!({}), ttl).await;
    state.pages.insert("/products", json!([]), ttl).await;
    state
        .pages
        .insert("/categories/cognitive-neurological-nootropic", json!({}), ttl)
        .await;
    state.pages.insert("/products/semax", json!({}), ttl).await;
}

fn sync_request(body: &Value, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/sync")
        .header("content-type", "application/json");
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    builder
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn changed_body() -> Value {
    json!({
        "base": {"id": "appTEST"},
        "webhook": {"id": "achX"},
        "payload": {
            "changedTablesById": {
                TABLE_ID: {"changedRecordsById": {"recA": {}, "recB": {}}}
            }
        }
    })
}

async fn json_body(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json parse")
}

async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
        .await
        .expect("response")
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("unauthorized", StatusCode::UNAUTHORIZED),
        ("not_found", StatusCode::NOT_FOUND),
        ("service_unavailable", StatusCode::SERVICE_UNAVAILABLE),
        ("upstream_error", StatusCode::BAD_GATEWAY),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "message").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[tokio::test]
async fn health_reports_database_ok() {
    let server = MockServer::start().await;
    let app = open_app(test_state(test_config(&server.uri(), None)).await);

    let response = get(app, "/api/v1/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
    let json = json_body(response).await;
    assert_eq!(json["data"]["database"], "ok");
}

#[tokio::test]
async fn sync_with_wrong_secret_is_rejected_and_cache_untouched() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), Some("hook-secret"))).await;
    warm_caches(&state).await;
    let app = open_app(state.clone());

    let response = app
        .oneshot(sync_request(&changed_body(), Some("Bearer wrong")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(state.pages.contains("/shop").await);
    assert!(state.pages.contains("/products").await);
    assert!(state.catalog.peek().await.is_some());
}

#[tokio::test]
async fn sync_without_header_is_rejected_when_secret_set() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), Some("hook-secret"))).await;
    warm_caches(&state).await;
    let app = open_app(state.clone());

    let response = app
        .oneshot(sync_request(&changed_body(), None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "unauthorized");
    assert!(state.pages.contains("/shop").await);
}

#[tokio::test]
async fn sync_with_no_changes_leaves_cache_alone() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), Some("hook-secret"))).await;
    warm_caches(&state).await;
    let app = open_app(state.clone());

    let body = json!({"payload": {"changedTablesById": {"tblOTHER": {"changedRecordsById": {"recZ": {}}}}}});
    let response = app
        .oneshot(sync_request(&body, Some("Bearer hook-secret")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["message"], "No changes to sync");
    assert!(state.pages.contains("/shop").await);
    assert!(state.catalog.peek().await.is_some());
    assert!(labsync_db::get_sync_status(&state.pool)
        .await
        .expect("query")
        .is_none());
}

#[tokio::test]
async fn sync_with_unparseable_body_is_treated_as_empty() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;
    let app = open_app(state);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/sync")
                .body(Body::from("{not json"))
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["changed_records"], 0);
}

#[tokio::test]
async fn sync_reads_changes_despite_malformed_ids() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;
    warm_caches(&state).await;
    let app = open_app(state.clone());
    let mut body = changed_body();
    body["base"] = json!("appTEST");
    body["webhook"] = json!({"id": 7});

    let response = app
        .oneshot(sync_request(&body, None))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["changed_records"], 2);
    assert!(!state.pages.contains("/shop").await);
}

#[tokio::test]
async fn sync_with_changes_invalidates_listing_pages_only() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), Some("hook-secret"))).await;
    warm_caches(&state).await;
    let app = open_app(state.clone());

    let response = app
        .oneshot(sync_request(&changed_body(), Some("Bearer hook-secret")))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["changed_records"], 2);
    assert_eq!(json["data"]["revalidated"][0], "/shop");
    assert_eq!(json["data"]["revalidated"].as_array().map(Vec::len), Some(9));

    assert!(!state.pages.contains("/shop").await);
    assert!(!state.pages.contains("/products").await);
    assert!(
        !state
            .pages
            .contains("/categories/cognitive-neurological-nootropic")
            .await
    );
    assert!(state.pages.contains("/products/semax").await);
    assert!(state.catalog.peek().await.is_none());

    let status = labsync_db::get_sync_status(&state.pool)
        .await
        .expect("query")
        .expect("status recorded");
    assert_eq!(status.status, "success");
    assert_eq!(status.record_count, 2);
}

#[tokio::test]
async fn sync_during_catalog_fetch_keeps_stale_pages_out_of_cache() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/appTEST/tblTEST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "records": [
                        {"id": "rec1", "fields": {"Product_Name": "Semax (5mg)", "Category": CATEGORY, "Price_USD": 30, "In_Stock": true}}
                    ]
                }))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;
    let state = test_state(test_config(&server.uri(), None)).await;
    let app = open_app(state.clone());

    let shop = tokio::spawn(get(app.clone(), "/api/v1/shop"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    let response = app
        .oneshot(sync_request(&changed_body(), None))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let shop = shop.await.expect("shop task");
    assert_eq!(shop.status(), StatusCode::OK);
    let json = json_body(shop).await;
    assert_eq!(json["data"]["products"][0]["slug"], "semax");

    assert!(!state.pages.contains("/shop").await);
    assert!(state.catalog.peek().await.is_none());
}

#[tokio::test]
async fn products_groups_variants_from_snapshot() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;
    state
        .catalog
        .store(&[
            record("X (5mg)", "5mg", Decimal::new(4000, 2)),
            record("X (10mg)", "10mg", Decimal::new(7000, 2)),
        ])
        .await;
    let app = open_app(state.clone());

    let response = get(app, "/api/v1/products").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    let groups = json["data"].as_array().expect("data array");
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0]["base_name"], "X");
    assert_eq!(groups[0]["min_price"], "40.00");
    assert_eq!(groups[0]["variants"].as_array().map(Vec::len), Some(2));
    assert!(state.pages.contains("/products").await);
}

#[tokio::test]
async fn filtered_listing_is_not_cached() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;
    state
        .catalog
        .store(&[
            record("X (5mg)", "5mg", Decimal::new(4000, 2)),
            record("Y (5mg)", "5mg", Decimal::new(9000, 2)),
        ])
        .await;
    let app = open_app(state.clone());

    let response = get(app, "/api/v1/products?max_price=50").await;

    let json = json_body(response).await;
    assert_eq!(json["data"].as_array().map(Vec::len), Some(1));
    assert!(!state.pages.contains("/products").await);
}

#[tokio::test]
async fn products_are_fetched_from_airtable_when_cold() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/appTEST/tblTEST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [
                {"id": "rec1", "fields": {"Product_Name": "Semax (5mg)", "Category": CATEGORY, "Price_USD": 30, "In_Stock": true}},
                {"id": "rec2", "fields": {"Product_Name": "Hidden (5mg)", "Category": CATEGORY, "Price_USD": 30, "API_Visibility_Status": "DRAFT"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let state = test_state(test_config(&server.uri(), None)).await;

    let response = get(open_app(state.clone()), "/api/v1/products/semax").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["slug"], "semax");

    let response = get(open_app(state), "/api/v1/products/hidden").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn catalog_outage_maps_to_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/appTEST/tblTEST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let state = test_state(test_config(&server.uri(), None)).await;

    let response = get(open_app(state), "/api/v1/shop").await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn category_page_lists_matching_groups() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;
    state
        .catalog
        .store(&[record("Semax (5mg)", "5mg", Decimal::new(3000, 2))])
        .await;

    let response = get(
        open_app(state.clone()),
        "/api/v1/categories/cognitive-neurological-nootropic",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["name"], CATEGORY);

    let response = get(open_app(state), "/api/v1/categories/unknown").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn short_search_returns_nothing_without_catalog() {
    // No Airtable mock mounted: a catalog fetch would fail the request.
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;

    let response = get(open_app(state), "/api/v1/search?q=x").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["total"], 0);
    assert!(json["data"]["hits"].as_array().expect("hits").is_empty());
}

#[tokio::test]
async fn search_finds_products_and_generated_articles() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;
    state
        .catalog
        .store(&[record("Semax (5mg)", "5mg", Decimal::new(3000, 2))])
        .await;

    let response = get(open_app(state), "/api/v1/search?q=semax").await;

    let json = json_body(response).await;
    let hits = json["data"]["hits"].as_array().expect("hits");
    assert_eq!(hits[0]["kind"], "product");
    assert!(hits.iter().any(|h| h["kind"] == "article" && h["generated"] == true));
}

#[tokio::test]
async fn blog_lists_generated_articles() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;
    state
        .catalog
        .store(&[record("Semax (5mg)", "5mg", Decimal::new(3000, 2))])
        .await;

    let response = get(open_app(state.clone()), "/api/v1/blog").await;
    let json = json_body(response).await;
    assert_eq!(json["data"][0]["slug"], "semax");
    assert_eq!(json["data"][0]["generated"], true);

    let response = get(open_app(state), "/api/v1/blog/semax").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn generated_article_during_catalog_outage_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/appTEST/tblTEST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    let state = test_state(test_config(&server.uri(), None)).await;

    let response = get(open_app(state.clone()), "/api/v1/blog/semax").await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let json = json_body(response).await;
    assert_eq!(json["error"]["code"], "upstream_error");

    let response = get(open_app(state), "/api/v1/blog").await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn newsletter_without_key_is_unavailable() {
    let server = MockServer::start().await;
    let app = open_app(test_state(test_config(&server.uri(), None)).await);

    let response = app
        .oneshot(post_json(
            "/api/v1/newsletter/subscribe",
            &json!({"email": "lab@example.com"}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn newsletter_rejects_email_without_at_sign() {
    let server = MockServer::start().await;
    let mut config = test_config(&server.uri(), None);
    config.convertkit_api_key = Some("kit-key".to_string());
    let app = open_app(test_state(config).await);

    let response = app
        .oneshot(post_json(
            "/api/v1/newsletter/subscribe",
            &json!({"email": "not-an-email"}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn newsletter_subscribes_through_provider() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v4/subscribers"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"subscriber": {"id": 1}})))
        .expect(1)
        .mount(&server)
        .await;
    let mut config = test_config(&server.uri(), None);
    config.convertkit_api_key = Some("kit-key".to_string());
    let app = open_app(test_state(config).await);

    let response = app
        .oneshot(post_json(
            "/api/v1/newsletter/subscribe",
            &json!({"email": "lab@example.com", "first_name": "Ada"}),
        ))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["already_subscribed"], false);
}

#[tokio::test]
async fn contact_requires_message_and_stores_valid_submissions() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;

    let response = open_app(state.clone())
        .oneshot(post_json(
            "/api/v1/contact",
            &json!({"first_name": "Ada", "email": "ada@example.com", "subject": "COA"}),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = json_body(response).await;
    assert_eq!(json["error"]["message"], "message is required");

    let response = open_app(state.clone())
        .oneshot(post_json(
            "/api/v1/contact",
            &json!({
                "firstName": "Ada",
                "email": "ada@example.com",
                "subject": "COA",
                "message": "Where is the certificate for lot 42?"
            }),
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_submissions")
        .fetch_one(&state.pool)
        .await
        .expect("count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn webhook_test_reports_missing_subscription() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;

    let response = get(open_app(state), "/webhook/test").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["registered"], false);
    assert!(json["data"]["subscription"].is_null());
}

#[tokio::test]
async fn admin_routes_require_bearer_key_when_configured() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;
    let auth = AuthState::from_keys("admin-key", false).expect("auth");
    let app = build_app(state, auth, default_rate_limit_state());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/poll")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    // GET on the same path stays public.
    let response = get(app, "/webhook/test").await;
    assert_eq!(response.status(), StatusCode::OK);
}

fn admin_post(uri: &str, key: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("POST").uri(uri);
    if let Some(key) = key {
        builder = builder.header(AUTHORIZATION, format!("Bearer {key}"));
    }
    builder.body(Body::empty()).expect("request")
}

#[tokio::test]
async fn unauthenticated_calls_do_not_spend_the_rate_limit() {
    let server = MockServer::start().await;
    let state = test_state(test_config(&server.uri(), None)).await;
    let auth = AuthState::from_keys("admin-key", false).expect("auth");
    let app = build_app(state, auth, RateLimitState::new(1, Duration::from_secs(60)));

    for _ in 0..3 {
        let response = app
            .clone()
            .oneshot(admin_post("/webhook/poll", None))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = json_body(response).await;
        assert_eq!(json["error"]["code"], "unauthorized");
        assert!(json["meta"]["request_id"].is_string());
    }

    // No subscription stored, so an admitted poll is a 404.
    let response = app
        .clone()
        .oneshot(admin_post("/webhook/poll", Some("admin-key")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(admin_post("/webhook/poll", Some("admin-key")))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));

    // Each admin route has its own window.
    let response = app
        .oneshot(admin_post("/webhook/test", Some("admin-key")))
        .await
        .expect("response");
    assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn register_then_poll_through_admin_routes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v0/bases/appTEST/webhooks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "achNEW"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/bases/appTEST/webhooks/achNEW/payloads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "payloads": [],
            "mightHaveMore": false
        })))
        .mount(&server)
        .await;
    let state = test_state(test_config(&server.uri(), None)).await;
    let auth = AuthState::from_keys("admin-key", false).expect("auth");
    let app = build_app(state.clone(), auth, default_rate_limit_state());

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/register")
                .header(AUTHORIZATION, "Bearer admin-key")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["subscription_id"], "achNEW");
    assert_eq!(
        json["data"]["callback_url"],
        format!("{}/sync", server.uri())
    );

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/poll")
                .header(AUTHORIZATION, "Bearer admin-key")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let json = json_body(response).await;
    assert_eq!(json["data"]["subscription_id"], "achNEW");
    assert!(json["data"]["last_checked_at"].is_string());
}

#[tokio::test]
async fn poll_without_subscription_is_not_found() {
    let server = MockServer::start().await;
    let app = open_app(test_state(test_config(&server.uri(), None)).await);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/webhook/poll")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
