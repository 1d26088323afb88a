//! Wire types for the Airtable REST and webhook APIs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `POST /v0/bases/{baseId}/webhooks`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWebhook {
    pub id: String,
    #[serde(default)]
    pub mac_secret_base64: Option<String>,
    #[serde(default)]
    pub expiration_time: Option<String>,
}

/// Response of `GET /v0/bases/{baseId}/webhooks/{webhookId}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookInfo {
    pub id: String,
    #[serde(default)]
    pub is_hook_enabled: bool,
    #[serde(default)]
    pub notification_url: Option<String>,
    #[serde(default)]
    pub expiration_time: Option<String>,
}

/// One page of pending webhook payloads.
///
/// Payloads are kept as raw JSON: they are forwarded verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadPage {
    #[serde(default)]
    pub payloads: Vec<Value>,
    #[serde(default)]
    pub cursor: Option<i64>,
    #[serde(default)]
    pub might_have_more: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateWebhookRequest<'a> {
    pub notification_url: &'a str,
    pub specification: WebhookSpecification,
}

#[derive(Debug, Serialize)]
pub(crate) struct WebhookSpecification {
    pub options: WebhookOptions,
}

#[derive(Debug, Serialize)]
pub(crate) struct WebhookOptions {
    pub filters: WebhookFilters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct WebhookFilters {
    pub data_types: Vec<&'static str>,
}

impl<'a> CreateWebhookRequest<'a> {
    /// Subscribe to cell-level table data changes only.
    pub(crate) fn table_data(notification_url: &'a str) -> Self {
        Self {
            notification_url,
            specification: WebhookSpecification {
                options: WebhookOptions {
                    filters: WebhookFilters {
                        data_types: vec!["tableData"],
                    },
                },
            },
        }
    }
}

/// A record as returned by the list-records endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
    #[serde(default)]
    pub created_time: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecordPage {
    #[serde(default)]
    pub records: Vec<RawRecord>,
    #[serde(default)]
    pub offset: Option<String>,
}
