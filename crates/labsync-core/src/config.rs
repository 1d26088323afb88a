use crate::app_config::{AppConfig, Environment, DEFAULT_REVALIDATE_CATEGORIES};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|v| !v.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let database_url = require("DATABASE_URL")?;
    let airtable_api_key = require("AIRTABLE_API_KEY")?;
    let airtable_base_id = require("AIRTABLE_BASE_ID")?;
    let airtable_table_id = require("AIRTABLE_TABLE_ID")?;

    let env = parse_environment(&or_default("LABSYNC_ENV", "development"))?;

    let bind_addr = parse_addr("LABSYNC_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("LABSYNC_LOG_LEVEL", "info");
    let site_url = or_default("LABSYNC_SITE_URL", "http://localhost:3000")
        .trim_end_matches('/')
        .to_string();
    if !(site_url.starts_with("http://") || site_url.starts_with("https://")) {
        return Err(ConfigError::InvalidEnvVar {
            var: "LABSYNC_SITE_URL".to_string(),
            reason: format!("expected an http(s) URL, got \"{site_url}\""),
        });
    }
    let articles_path = PathBuf::from(or_default(
        "LABSYNC_ARTICLES_PATH",
        "./config/articles.yaml",
    ));
    let revalidate_categories = optional("LABSYNC_REVALIDATE_CATEGORIES").map_or_else(
        || {
            DEFAULT_REVALIDATE_CATEGORIES
                .iter()
                .map(ToString::to_string)
                .collect()
        },
        |raw| parse_list(&raw),
    );

    let airtable_api_url = or_default("AIRTABLE_API_URL", "https://api.airtable.com/");
    let airtable_max_retries = parse_u32("LABSYNC_AIRTABLE_MAX_RETRIES", "2")?;
    let airtable_backoff_ms = parse_u64("LABSYNC_AIRTABLE_BACKOFF_MS", "500")?;
    let webhook_secret = optional("AIRTABLE_WEBHOOK_SECRET");

    let convertkit_api_key = optional("CONVERTKIT_API_KEY");
    let convertkit_form_id = optional("CONVERTKIT_FORM_ID");
    let convertkit_api_url = or_default("CONVERTKIT_API_URL", "https://api.kit.com/");

    let catalog_ttl_secs = parse_u64("LABSYNC_CATALOG_TTL_SECS", "60")?;
    let page_ttl_secs = parse_u64("LABSYNC_PAGE_TTL_SECS", "3600")?;
    let detail_ttl_secs = parse_u64("LABSYNC_DETAIL_TTL_SECS", "60")?;
    let http_timeout_secs = parse_u64("LABSYNC_HTTP_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("LABSYNC_USER_AGENT", "labsync/0.1 (catalog-sync)");

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        site_url,
        articles_path,
        revalidate_categories,
        airtable_api_key,
        airtable_base_id,
        airtable_table_id,
        airtable_api_url,
        airtable_max_retries,
        airtable_backoff_ms,
        webhook_secret,
        convertkit_api_key,
        convertkit_form_id,
        convertkit_api_url,
        catalog_ttl_secs,
        page_ttl_secs,
        detail_ttl_secs,
        http_timeout_secs,
        user_agent,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidEnvVar`] for anything other than
/// `development`, `test` or `production`.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "LABSYNC_ENV".to_string(),
            reason: format!("unknown environment \"{other}\""),
        }),
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
