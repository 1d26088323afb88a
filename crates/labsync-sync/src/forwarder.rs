use std::time::Duration;

use labsync_core::AppConfig;
use reqwest::Client;
use serde_json::Value;

use crate::error::{ForwardError, SyncError};
use crate::notification::WebhookNotification;

/// Posts webhook payloads to the site's `/sync` endpoint.
pub struct SyncForwarder {
    client: Client,
    target_url: String,
    secret: Option<String>,
}

impl SyncForwarder {
    /// # Errors
    ///
    /// Returns [`SyncError::ForwarderSetup`] if the HTTP client cannot be built.
    pub fn new(
        target_url: &str,
        secret: Option<&str>,
        timeout_secs: u64,
    ) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(SyncError::ForwarderSetup)?;

        Ok(Self {
            client,
            target_url: target_url.to_string(),
            secret: secret.map(ToOwned::to_owned),
        })
    }

    /// Forwarder for the configured site: `{site_url}/sync` with the shared
    /// webhook secret.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::ForwarderSetup`] if the HTTP client cannot be built.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, SyncError> {
        Self::new(
            &config.callback_url(),
            config.webhook_secret.as_deref(),
            config.http_timeout_secs,
        )
    }

    /// Deliver one payload. Any non-2xx answer counts as a failure.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::Http`] on network failure or
    /// [`ForwardError::Status`] on a non-2xx response.
    pub async fn forward(
        &self,
        base_id: &str,
        webhook_id: &str,
        payload: &Value,
    ) -> Result<(), ForwardError> {
        let body = WebhookNotification::new(base_id, webhook_id, payload.clone());
        let mut request = self.client.post(&self.target_url).json(&body);
        if let Some(secret) = self.secret.as_deref() {
            request = request.bearer_auth(secret);
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ForwardError::Status(status.as_u16()))
        }
    }
}
