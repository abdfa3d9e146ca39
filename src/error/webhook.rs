//! Errors raised while handling inbound push notifications.

use thiserror::Error;

/// Webhook request errors. These are mapped to HTTP responses; they never
/// escape the request handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// Body was not JSON.
    #[error("request body is not valid JSON: {0}")]
    InvalidBody(String),

    /// Body did not carry a `topic`.
    #[error("request body has no topic")]
    MissingTopic,

    /// No configured store matched, or no token pair matched.
    #[error("unauthorized")]
    Unauthorized,
}

impl WebhookError {
    /// HTTP status code the handler responds with.
    pub fn status_code(&self) -> u16 {
        match self {
            WebhookError::InvalidBody(_) | WebhookError::MissingTopic => 400,
            WebhookError::Unauthorized => 401,
        }
    }
}
