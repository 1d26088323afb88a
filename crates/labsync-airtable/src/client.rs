//! HTTP client for the Airtable REST and webhook APIs.

use std::time::Duration;

use labsync_core::{AppConfig, ProductRecord};
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;

use crate::error::AirtableError;
use crate::mapping::map_record;
use crate::retry::retry_with_backoff;
use crate::types::{CreateWebhookRequest, CreatedWebhook, PayloadPage, RecordPage, WebhookInfo};

const DEFAULT_BASE_URL: &str = "https://api.airtable.com/";
const DEFAULT_USER_AGENT: &str = "labsync/0.1 (catalog-sync)";
const PAGE_SIZE: &str = "100";

/// Pagination guard for record listing. 100 pages × 100 records.
const MAX_PAGES: usize = 100;

/// Client for one Airtable base.
///
/// Use [`AirtableClient::from_app_config`] in binaries or
/// [`AirtableClient::with_base_url`] to point at a mock server in tests.
pub struct AirtableClient {
    client: Client,
    api_key: String,
    base_id: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl AirtableClient {
    /// Creates a client pointed at the production Airtable API.
    ///
    /// # Errors
    ///
    /// Returns [`AirtableError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, base_id: &str, timeout_secs: u64) -> Result<Self, AirtableError> {
        Self::with_base_url(api_key, base_id, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// Retries are disabled; enable them with [`AirtableClient::with_retry`].
    ///
    /// # Errors
    ///
    /// Returns [`AirtableError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`AirtableError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        base_id: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, AirtableError> {
        Self::build(api_key, base_id, timeout_secs, base_url, DEFAULT_USER_AGENT)
    }

    /// Creates a client from the loaded application configuration, including
    /// its retry policy.
    ///
    /// # Errors
    ///
    /// See [`AirtableClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Self, AirtableError> {
        Ok(Self::build(
            &config.airtable_api_key,
            &config.airtable_base_id,
            config.http_timeout_secs,
            &config.airtable_api_url,
            &config.user_agent,
        )?
        .with_retry(config.airtable_max_retries, config.airtable_backoff_ms))
    }

    fn build(
        api_key: &str,
        base_id: &str,
        timeout_secs: u64,
        base_url: &str,
        user_agent: &str,
    ) -> Result<Self, AirtableError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `Url::join` appends instead of
        // replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| AirtableError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_id: base_id.to_owned(),
            base_url,
            max_retries: 0,
            backoff_base_ms: 0,
        })
    }

    /// Retry read calls up to `max_retries` times on transient errors.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    #[must_use]
    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    /// Registers a webhook for table data changes. Never retried.
    ///
    /// # Errors
    ///
    /// - [`AirtableError::Status`] on a non-2xx response.
    /// - [`AirtableError::Http`] on network failure.
    /// - [`AirtableError::Deserialize`] if the response lacks an `id`.
    pub async fn create_webhook(
        &self,
        notification_url: &str,
    ) -> Result<CreatedWebhook, AirtableError> {
        let url = self.endpoint(&format!("v0/bases/{}/webhooks", self.base_id))?;
        let response = self
            .client
            .post(url.clone())
            .bearer_auth(&self.api_key)
            .json(&CreateWebhookRequest::table_data(notification_url))
            .send()
            .await?;
        Self::parse_json(response, url.as_str()).await
    }

    /// Fetches webhook metadata, including `isHookEnabled`.
    ///
    /// # Errors
    ///
    /// - [`AirtableError::Status`] on a non-2xx response (404 when the hook
    ///   no longer exists).
    /// - [`AirtableError::Http`] on network failure.
    /// - [`AirtableError::Deserialize`] on an unexpected body.
    pub async fn get_webhook(&self, webhook_id: &str) -> Result<WebhookInfo, AirtableError> {
        let url = self.endpoint(&format!(
            "v0/bases/{}/webhooks/{webhook_id}",
            self.base_id
        ))?;
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.get_json(url.clone())
        })
        .await
    }

    /// Lists pending payloads, starting after `cursor` when given.
    ///
    /// # Errors
    ///
    /// - [`AirtableError::Status`] on a non-2xx response.
    /// - [`AirtableError::Http`] on network failure.
    /// - [`AirtableError::Deserialize`] on an unexpected body.
    pub async fn list_payloads(
        &self,
        webhook_id: &str,
        cursor: Option<i64>,
    ) -> Result<PayloadPage, AirtableError> {
        let mut url = self.endpoint(&format!(
            "v0/bases/{}/webhooks/{webhook_id}/payloads",
            self.base_id
        ))?;
        if let Some(cursor) = cursor {
            url.query_pairs_mut()
                .append_pair("cursor", &cursor.to_string());
        }
        retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
            self.get_json(url.clone())
        })
        .await
    }

    /// Acknowledges every payload up to `cursor`.
    ///
    /// # Errors
    ///
    /// - [`AirtableError::Status`] on a non-2xx response.
    /// - [`AirtableError::Http`] on network failure.
    pub async fn ack_payloads(&self, webhook_id: &str, cursor: i64) -> Result<(), AirtableError> {
        let url = self.endpoint(&format!(
            "v0/bases/{}/webhooks/{webhook_id}/payloads/{cursor}/ack",
            self.base_id
        ))?;
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// Lists every record in `table_id`, sorted by product name, and maps
    /// them into [`ProductRecord`]s. Each page is retried independently.
    ///
    /// # Errors
    ///
    /// - [`AirtableError::Status`] on a non-2xx response.
    /// - [`AirtableError::Http`] on network failure.
    /// - [`AirtableError::Deserialize`] on an unexpected body.
    /// - [`AirtableError::TooManyPages`] if the offset chain does not end.
    pub async fn list_records(&self, table_id: &str) -> Result<Vec<ProductRecord>, AirtableError> {
        let base = self.endpoint(&format!("v0/{}/{table_id}", self.base_id))?;
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        for _ in 0..MAX_PAGES {
            let mut url = base.clone();
            {
                let mut pairs = url.query_pairs_mut();
                pairs.append_pair("pageSize", PAGE_SIZE);
                pairs.append_pair("sort[0][field]", "Product_Name");
                pairs.append_pair("sort[0][direction]", "asc");
                if let Some(offset) = offset.as_deref() {
                    pairs.append_pair("offset", offset);
                }
            }

            let page: RecordPage =
                retry_with_backoff(self.max_retries, self.backoff_base_ms, || {
                    self.get_json(url.clone())
                })
                .await?;

            records.extend(page.records.iter().map(map_record));

            match page.offset {
                Some(next) => offset = Some(next),
                None => {
                    tracing::debug!(table_id, count = records.len(), "fetched product records");
                    return Ok(records);
                }
            }
        }

        Err(AirtableError::TooManyPages {
            max_pages: MAX_PAGES,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AirtableError> {
        self.base_url
            .join(path)
            .map_err(|e| AirtableError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, AirtableError> {
        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.api_key)
            .send()
            .await?;
        Self::parse_json(response, url.as_str()).await
    }

    async fn parse_json<T: DeserializeOwned>(
        response: Response,
        context: &str,
    ) -> Result<T, AirtableError> {
        let body = Self::check_status(response).await?.text().await?;
        serde_json::from_str(&body).map_err(|e| AirtableError::Deserialize {
            context: context.to_string(),
            source: e,
        })
    }

    /// Turns a non-2xx response into [`AirtableError::Status`] carrying the body.
    async fn check_status(response: Response) -> Result<Response, AirtableError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AirtableError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
