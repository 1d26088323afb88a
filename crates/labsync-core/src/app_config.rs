use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Category slugs revalidated on every sync unless
/// `LABSYNC_REVALIDATE_CATEGORIES` overrides them.
pub const DEFAULT_REVALIDATE_CATEGORIES: [&str; 7] = [
    "beauty-anti-aging-antioxidant",
    "weight-loss-blood-sugar-control-metabolic-regulation",
    "hormones-growth-factors-bodybuilding",
    "repair-healing-anti-inflammatory",
    "cognitive-neurological-nootropic",
    "sexual-health-libido-enhancement",
    "other-research-compounds",
];

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Public base URL of the site; the webhook callback is `{site_url}/sync`.
    pub site_url: String,
    pub articles_path: PathBuf,
    pub revalidate_categories: Vec<String>,
    pub airtable_api_key: String,
    pub airtable_base_id: String,
    pub airtable_table_id: String,
    pub airtable_api_url: String,
    pub airtable_max_retries: u32,
    pub airtable_backoff_ms: u64,
    /// Shared secret expected as `Bearer <secret>` on `/sync`. `None` leaves
    /// the endpoint open.
    pub webhook_secret: Option<String>,
    pub convertkit_api_key: Option<String>,
    pub convertkit_form_id: Option<String>,
    pub convertkit_api_url: String,
    pub catalog_ttl_secs: u64,
    pub page_ttl_secs: u64,
    pub detail_ttl_secs: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl AppConfig {
    /// The URL Airtable is told to notify, and the poller forwards to.
    #[must_use]
    pub fn callback_url(&self) -> String {
        format!("{}/sync", self.site_url.trim_end_matches('/'))
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("site_url", &self.site_url)
            .field("articles_path", &self.articles_path)
            .field("revalidate_categories", &self.revalidate_categories)
            .field("database_url", &"[redacted]")
            .field("airtable_api_key", &"[redacted]")
            .field("airtable_base_id", &self.airtable_base_id)
            .field("airtable_table_id", &self.airtable_table_id)
            .field("airtable_api_url", &self.airtable_api_url)
            .field("airtable_max_retries", &self.airtable_max_retries)
            .field("airtable_backoff_ms", &self.airtable_backoff_ms)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[redacted]"),
            )
            .field(
                "convertkit_api_key",
                &self.convertkit_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("convertkit_form_id", &self.convertkit_form_id)
            .field("convertkit_api_url", &self.convertkit_api_url)
            .field("catalog_ttl_secs", &self.catalog_ttl_secs)
            .field("page_ttl_secs", &self.page_ttl_secs)
            .field("detail_ttl_secs", &self.detail_ttl_secs)
            .field("http_timeout_secs", &self.http_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}
