pub mod error;
pub mod forwarder;
pub mod notification;
pub mod poller;
pub mod registrar;
pub mod revalidation;

pub use error::{ForwardError, SyncError};
pub use forwarder::SyncForwarder;
pub use notification::WebhookNotification;
pub use poller::{poll_webhook, replay_dead_letters, PollOutcome, ReplayOutcome};
pub use registrar::{check_webhook_health, register_webhook, HookHealth};
pub use revalidation::{category_path, product_path, RevalidationPlan, PRODUCTS_PATH, SHOP_PATH};
