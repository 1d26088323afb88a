//! Newsletter sign-up through the Kit (formerly `ConvertKit`) v4 API.

use std::time::Duration;

use labsync_core::AppConfig;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.kit.com/";

#[derive(Debug, Error)]
pub enum NewsletterError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("newsletter provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Result of a subscribe call that the provider accepted.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub already_subscribed: bool,
    /// Subscriber object echoed back by the provider, when one was returned.
    pub subscriber: Option<Value>,
}

#[derive(Debug, Serialize)]
struct SubscriberRequest<'a> {
    email_address: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    first_name: Option<&'a str>,
}

/// Minimal shape check used before calling the provider.
#[must_use]
pub fn is_plausible_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.contains('@')
}

pub struct NewsletterClient {
    client: Client,
    api_key: String,
    form_id: Option<String>,
    base_url: Url,
}

impl NewsletterClient {
    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`NewsletterError::Http`] if the `reqwest::Client` cannot be
    /// built, or [`NewsletterError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        form_id: Option<&str>,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, NewsletterError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| NewsletterError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            form_id: form_id.map(ToOwned::to_owned),
            base_url,
        })
    }

    /// Builds a client from configuration. Returns `Ok(None)` when no API
    /// key is configured.
    ///
    /// # Errors
    ///
    /// See [`NewsletterClient::with_base_url`].
    pub fn from_app_config(config: &AppConfig) -> Result<Option<Self>, NewsletterError> {
        let Some(api_key) = config.convertkit_api_key.as_deref() else {
            return Ok(None);
        };
        let base_url = if config.convertkit_api_url.is_empty() {
            DEFAULT_BASE_URL
        } else {
            &config.convertkit_api_url
        };
        Self::with_base_url(
            api_key,
            config.convertkit_form_id.as_deref(),
            config.http_timeout_secs,
            base_url,
        )
        .map(Some)
    }

    /// Subscribe `email`, preferring the configured form.
    ///
    /// A failed form subscription falls through to direct subscriber
    /// creation. HTTP 409/422 from the final call means the address is
    /// already on the list and counts as success.
    ///
    /// # Errors
    ///
    /// Returns [`NewsletterError::Status`] for any other non-2xx status from
    /// the final call, or [`NewsletterError::Http`] on network failure.
    pub async fn subscribe(
        &self,
        email: &str,
        first_name: Option<&str>,
    ) -> Result<Subscription, NewsletterError> {
        let request = SubscriberRequest {
            email_address: email.trim(),
            first_name: first_name.map(str::trim).filter(|s| !s.is_empty()),
        };

        if let Some(form_id) = self.form_id.as_deref() {
            let url = self.endpoint(&format!("v4/forms/{form_id}/subscribers"))?;
            match self.post(url, &request).await {
                Ok(response) if response.status().is_success() => {
                    return Ok(Subscription {
                        already_subscribed: false,
                        subscriber: subscriber_from(response).await,
                    });
                }
                Ok(response) => {
                    tracing::info!(
                        status = response.status().as_u16(),
                        "form subscription failed, falling back to direct subscriber creation"
                    );
                }
                Err(e) => {
                    tracing::info!(
                        error = %e,
                        "form subscription failed, falling back to direct subscriber creation"
                    );
                }
            }
        }

        let url = self.endpoint("v4/subscribers")?;
        let response = self.post(url, &request).await?;
        let status = response.status();

        if status.is_success() {
            return Ok(Subscription {
                already_subscribed: false,
                subscriber: subscriber_from(response).await,
            });
        }

        if status == StatusCode::CONFLICT || status == StatusCode::UNPROCESSABLE_ENTITY {
            return Ok(Subscription {
                already_subscribed: true,
                subscriber: None,
            });
        }

        let body = response.text().await.unwrap_or_default();
        tracing::error!(
            status = status.as_u16(),
            %body,
            "newsletter provider rejected subscription"
        );
        Err(NewsletterError::Status {
            status: status.as_u16(),
            body,
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, NewsletterError> {
        self.base_url
            .join(path)
            .map_err(|e| NewsletterError::InvalidBaseUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    async fn post(
        &self,
        url: Url,
        request: &SubscriberRequest<'_>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.client
            .post(url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
    }
}

/// Unwraps `{"subscriber": {...}}` when present, otherwise returns the body.
async fn subscriber_from(response: reqwest::Response) -> Option<Value> {
    let body: Value = response.json().await.ok()?;
    match body.get("subscriber") {
        Some(subscriber) => Some(subscriber.clone()),
        None => Some(body),
    }
}
