use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

/// Returns a map with all required env vars populated with valid defaults.
fn full_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("DATABASE_URL", "sqlite::memory:");
    m.insert("AIRTABLE_API_KEY", "pat-test");
    m.insert("AIRTABLE_BASE_ID", "appTEST");
    m.insert("AIRTABLE_TABLE_ID", "tblTEST");
    m
}

#[test]
fn parse_environment_development() {
    assert_eq!(
        parse_environment("development").unwrap(),
        Environment::Development
    );
}

#[test]
fn parse_environment_production() {
    assert_eq!(
        parse_environment("production").unwrap(),
        Environment::Production
    );
}

#[test]
fn parse_environment_unknown_fails() {
    let err = parse_environment("staging").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { ref var, .. } if var == "LABSYNC_ENV"));
}

#[test]
fn build_app_config_fails_without_database_url() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "DATABASE_URL"),
        "expected MissingEnvVar(DATABASE_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_without_airtable_table_id() {
    let mut map = full_env();
    map.remove("AIRTABLE_TABLE_ID");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "AIRTABLE_TABLE_ID"),
        "expected MissingEnvVar(AIRTABLE_TABLE_ID), got: {result:?}"
    );
}

#[test]
fn build_app_config_treats_blank_api_key_as_missing() {
    let mut map = full_env();
    map.insert("AIRTABLE_API_KEY", "   ");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "AIRTABLE_API_KEY"),
        "expected MissingEnvVar(AIRTABLE_API_KEY), got: {result:?}"
    );
}

#[test]
fn build_app_config_fails_with_invalid_bind_addr() {
    let mut map = full_env();
    map.insert("LABSYNC_BIND_ADDR", "not-a-socket-addr");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LABSYNC_BIND_ADDR"),
        "expected InvalidEnvVar(LABSYNC_BIND_ADDR), got: {result:?}"
    );
}

#[test]
fn build_app_config_rejects_non_http_site_url() {
    let mut map = full_env();
    map.insert("LABSYNC_SITE_URL", "ftp://example.com");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LABSYNC_SITE_URL"),
        "expected InvalidEnvVar(LABSYNC_SITE_URL), got: {result:?}"
    );
}

#[test]
fn build_app_config_succeeds_with_all_required_vars() {
    let map = full_env();
    let result = build_app_config(lookup_from_map(&map));
    assert!(result.is_ok(), "expected Ok, got: {result:?}");
    let cfg = result.unwrap();
    assert_eq!(cfg.env, Environment::Development);
    assert_eq!(cfg.bind_addr.to_string(), "0.0.0.0:3000");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.site_url, "http://localhost:3000");
    assert_eq!(cfg.airtable_base_id, "appTEST");
    assert_eq!(cfg.airtable_table_id, "tblTEST");
    assert_eq!(cfg.airtable_api_url, "https://api.airtable.com/");
    assert_eq!(cfg.airtable_max_retries, 2);
    assert_eq!(cfg.airtable_backoff_ms, 500);
    assert!(cfg.webhook_secret.is_none());
    assert!(cfg.convertkit_api_key.is_none());
    assert_eq!(cfg.catalog_ttl_secs, 60);
    assert_eq!(cfg.page_ttl_secs, 3600);
    assert_eq!(cfg.detail_ttl_secs, 60);
    assert_eq!(cfg.http_timeout_secs, 30);
    assert_eq!(cfg.user_agent, "labsync/0.1 (catalog-sync)");
    assert_eq!(cfg.revalidate_categories.len(), 7);
    assert_eq!(cfg.revalidate_categories[0], "beauty-anti-aging-antioxidant");
}

#[test]
fn callback_url_strips_trailing_slash() {
    let mut map = full_env();
    map.insert("LABSYNC_SITE_URL", "https://shop.example.com/");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.callback_url(), "https://shop.example.com/sync");
}

#[test]
fn revalidate_categories_override_is_trimmed() {
    let mut map = full_env();
    map.insert("LABSYNC_REVALIDATE_CATEGORIES", " peptides , ,blends ");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.revalidate_categories, vec!["peptides", "blends"]);
}

#[test]
fn blank_webhook_secret_leaves_sync_open() {
    let mut map = full_env();
    map.insert("AIRTABLE_WEBHOOK_SECRET", "");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.webhook_secret.is_none());
}

#[test]
fn catalog_ttl_secs_invalid() {
    let mut map = full_env();
    map.insert("LABSYNC_CATALOG_TTL_SECS", "soon");
    let result = build_app_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "LABSYNC_CATALOG_TTL_SECS"),
        "expected InvalidEnvVar(LABSYNC_CATALOG_TTL_SECS), got: {result:?}"
    );
}

#[test]
fn debug_output_redacts_secrets() {
    let mut map = full_env();
    map.insert("AIRTABLE_WEBHOOK_SECRET", "hunter2");
    let cfg = build_app_config(lookup_from_map(&map)).unwrap();
    let rendered = format!("{cfg:?}");
    assert!(!rendered.contains("pat-test"));
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("[redacted]"));
}
