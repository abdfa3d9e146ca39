//! Push-based refresh.
//!
//! An inbound notification is authenticated against the configured stores
//! by shared-secret token, then matched against the store's triggers. A
//! match expires the store's cache entries and emits one refresh event.

mod server;
mod tracker;

pub use server::{handle_notification, router, start_webhook_server_on, WebhookServerState};
pub use tracker::{authenticate, resolve_trigger, track, WebhookAuthState, WebhookRequest};
