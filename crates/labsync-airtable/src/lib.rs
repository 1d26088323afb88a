pub mod client;
pub mod error;
pub mod mapping;
pub(crate) mod retry;
pub mod types;

pub use client::AirtableClient;
pub use error::AirtableError;
pub use mapping::map_record;
pub use types::{CreatedWebhook, PayloadPage, RawRecord, WebhookInfo};
