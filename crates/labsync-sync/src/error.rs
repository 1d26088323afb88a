use labsync_airtable::AirtableError;
use labsync_db::DbError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no webhook subscription registered")]
    NoSubscription,

    #[error(transparent)]
    Airtable(#[from] AirtableError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error("failed to build forwarding client: {0}")]
    ForwarderSetup(#[source] reqwest::Error),
}

/// Why a payload could not be delivered to the sync endpoint.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("sync endpoint returned HTTP {0}")]
    Status(u16),
}
