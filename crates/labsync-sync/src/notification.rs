//! Shape of the webhook notification posted to `/sync`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdRef {
    pub id: String,
}

/// `{base:{id}, webhook:{id}, payload}` as sent by the poller.
///
/// Every part is optional; unknown fields are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WebhookNotification {
    #[serde(default)]
    pub base: Option<IdRef>,
    #[serde(default)]
    pub webhook: Option<IdRef>,
    #[serde(default)]
    pub payload: Option<Value>,
}

impl WebhookNotification {
    #[must_use]
    pub fn new(base_id: &str, webhook_id: &str, payload: Value) -> Self {
        Self {
            base: Some(IdRef {
                id: base_id.to_string(),
            }),
            webhook: Some(IdRef {
                id: webhook_id.to_string(),
            }),
            payload: Some(payload),
        }
    }

    /// Parse a request body. A body that is not a JSON object is an empty
    /// notification. Each field is read on its own, so a malformed `base` or
    /// `webhook` does not hide the `payload`.
    #[must_use]
    pub fn parse_lenient(body: &[u8]) -> Self {
        let Ok(Value::Object(mut fields)) = serde_json::from_slice::<Value>(body) else {
            return Self::default();
        };
        let payload = fields.remove("payload").filter(|p| !p.is_null());
        Self {
            base: fields.get("base").and_then(id_ref),
            webhook: fields.get("webhook").and_then(id_ref),
            payload,
        }
    }

    /// Ids of records changed in `table_id`, in payload order.
    ///
    /// Read from `payload.changedTablesById[table_id].changedRecordsById`;
    /// changes to other tables are ignored.
    #[must_use]
    pub fn changed_record_ids(&self, table_id: &str) -> Vec<String> {
        self.payload
            .as_ref()
            .and_then(|p| p.get("changedTablesById"))
            .and_then(|tables| tables.get(table_id))
            .and_then(|table| table.get("changedRecordsById"))
            .and_then(Value::as_object)
            .map(|records| records.keys().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn webhook_id(&self) -> Option<&str> {
        self.webhook.as_ref().map(|w| w.id.as_str())
    }

    #[must_use]
    pub fn base_id(&self) -> Option<&str> {
        self.base.as_ref().map(|b| b.id.as_str())
    }
}

/// `{"id": ...}` with a string or numeric id.
fn id_ref(value: &Value) -> Option<IdRef> {
    let id = match value.get("id")? {
        Value::String(id) => id.clone(),
        Value::Number(id) => id.to_string(),
        _ => return None,
    };
    Some(IdRef { id })
}
